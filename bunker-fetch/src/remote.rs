use std::{fs, io, io::Read, path::Path};

/// An already-authenticated remote-filesystem session, e.g. an SFTP channel.
///
/// Session setup (SSH dial, key handling) happens outside this crate; the
/// consumer-side operations only need read access to the backup directory.
pub trait RemoteFs {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>>;

    /// File names (not paths) of the entries in `path`. Entries with
    /// non-unicode names are skipped.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// `RemoteFs` over a locally reachable directory: tests, or backup
/// directories mounted via sshfs/NFS.
#[derive(Debug, Default)]
pub struct LocalFs;

impl RemoteFs for LocalFs {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            if let Some(name) = entry?.file_name().to_str() {
                names.push(name.to_owned());
            }
        }
        Ok(names)
    }
}
