use serde::Serialize;

/// Owned binary payload of a [`Value::Blob`](crate::Value::Blob).
///
/// Cloning performs a deep byte-for-byte copy; equality compares content. A `Blob` read from a
/// column is always copied out of engine memory, so it stays valid after the statement moves on.
///
/// ```rust
/// use sqlite_access::Blob;
///
/// let mut a = Blob::from(vec![0x41; 4]);
/// let b = a.clone();
/// let c = a.take();
/// assert!(a.is_empty());
/// assert_eq!(b, c);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Blob {
    bytes: Vec<u8>,
}

impl Blob {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.bytes
    }

    /// Move the payload out, leaving `self` empty.
    #[must_use]
    pub fn take(&mut self) -> Blob {
        std::mem::take(self)
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl From<&[u8]> for Blob {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

impl<const N: usize> From<[u8; N]> for Blob {
    fn from(bytes: [u8; N]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
