use crate::protocol::xdr::{nfs2, nfs3};

/// Derives the 64-bit handle id of a host object.
///
/// The id is never zero so an all-zero handle can never resolve.
pub fn handle_id(dev: u64, ino: u64) -> u64 {
    let id = dev.rotate_left(32) ^ ino;
    if id == 0 {
        !id
    } else {
        id
    }
}

/// The server's view of a file handle: the id in its first 8 bytes,
/// big-endian. The rest of the wire handle is zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle(u64);

impl FileHandle {
    pub fn new(id: u64) -> Self {
        FileHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }

    pub fn to_v2(&self) -> nfs2::fhandle {
        let mut data = [0u8; nfs2::FHSIZE];
        data[..8].copy_from_slice(&self.0.to_be_bytes());
        nfs2::fhandle(data)
    }

    pub fn from_v2(fh: &nfs2::fhandle) -> Self {
        let mut id = [0u8; 8];
        id.copy_from_slice(&fh.0[..8]);
        FileHandle(u64::from_be_bytes(id))
    }

    pub fn to_v3(&self) -> nfs3::nfs_fh3 {
        let mut data = vec![0u8; nfs3::NFS3_FHSIZE as usize];
        data[..8].copy_from_slice(&self.0.to_be_bytes());
        nfs3::nfs_fh3 { data }
    }

    /// Fails with `BADHANDLE` when the handle is too short to carry an id.
    pub fn from_v3(fh: &nfs3::nfs_fh3) -> Result<Self, nfs3::nfsstat3> {
        let Some(bytes) = fh.data.get(..8) else {
            return Err(nfs3::nfsstat3::NFS3ERR_BADHANDLE);
        };
        let mut id = [0u8; 8];
        id.copy_from_slice(bytes);
        Ok(FileHandle(u64::from_be_bytes(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_mixes_device_and_inode() {
        assert_eq!(handle_id(1, 5), (1u64 << 32) ^ 5);
        assert_ne!(handle_id(1, 5), handle_id(2, 5));
    }

    #[test]
    fn id_is_never_zero() {
        assert_eq!(handle_id(0, 0), u64::MAX);
        assert_eq!(handle_id(1, 1 << 32), u64::MAX);
    }

    #[test]
    fn wire_forms_carry_the_id() {
        let fh = FileHandle::new(0x0102_0304_0506_0708);
        assert_eq!(FileHandle::from_v2(&fh.to_v2()), fh);
        let v3 = fh.to_v3();
        assert_eq!(v3.data.len(), 64);
        assert_eq!(FileHandle::from_v3(&v3), Ok(fh));
        let short = nfs3::nfs_fh3 { data: vec![1, 2, 3] };
        assert_eq!(FileHandle::from_v3(&short), Err(nfs3::nfsstat3::NFS3ERR_BADHANDLE));
    }
}
