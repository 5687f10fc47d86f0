//! Primitive readers and writers of the state format.
//!
//! [`StateWriter`] interns every [`ResourceContainer`] it writes: the first
//! reference carries the container identity, later ones only its pool index.
//! [`StateReader`] rebuilds the same pool while reading, so both sides must
//! see references in the same order.

use std::io::{self, Read, Write};
use std::sync::Arc;

use ckl_core::{
    ContainerKind, FxHashMap, ResourceContainer, ResourceLocator, ResourceOverrideKind, Timestamp,
};

use crate::error::StateError;

const CONTAINER_NEW: u8 = 0;
const CONTAINER_POOLED: u8 = 1;

/// Upper bound of the capacity reserved from a count read from the stream.
pub(crate) const MAX_PREALLOC: usize = 1024;

/// Writes state primitives to a byte stream.
#[derive(Debug)]
pub struct StateWriter<W> {
    inner: W,
    pool: FxHashMap<ResourceContainer, u32>,
}

impl<W: Write> StateWriter<W> {
    /// Creates a writer with an empty container pool.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            pool: FxHashMap::default(),
        }
    }

    /// Flushes and returns the underlying stream.
    ///
    /// # Errors
    ///
    /// Flush errors of the stream.
    pub fn into_inner(mut self) -> Result<W, StateError> {
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Returns the number of distinct containers written so far.
    #[must_use]
    pub fn pooled_containers(&self) -> usize {
        self.pool.len()
    }

    /// Writes raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), StateError> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Writes one byte.
    pub fn write_u8(&mut self, value: u8) -> Result<(), StateError> {
        self.write_bytes(&[value])
    }

    /// Writes a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) -> Result<(), StateError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `i32`.
    pub fn write_i32(&mut self, value: i32) -> Result<(), StateError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a little-endian `i64`.
    pub fn write_i64(&mut self, value: i64) -> Result<(), StateError> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Writes a count or length as `u32`.
    pub fn write_count(&mut self, count: usize) -> Result<(), StateError> {
        let count = u32::try_from(count).map_err(|_| StateError::TooLarge(count))?;
        self.write_u32(count)
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) -> Result<(), StateError> {
        self.write_count(value.len())?;
        self.write_bytes(value.as_bytes())
    }

    /// Writes an override kind byte.
    pub fn write_override_kind(&mut self, kind: ResourceOverrideKind) -> Result<(), StateError> {
        self.write_u8(kind.as_byte())
    }

    /// Writes a timestamp.
    pub fn write_timestamp(&mut self, time: Timestamp) -> Result<(), StateError> {
        self.write_i64(time.as_micros())
    }

    /// Writes a container reference through the pool.
    pub fn write_container(&mut self, container: &ResourceContainer) -> Result<(), StateError> {
        if let Some(&idx) = self.pool.get(container) {
            self.write_u8(CONTAINER_POOLED)?;
            return self.write_u32(idx);
        }
        let idx = u32::try_from(self.pool.len()).map_err(|_| StateError::TooLarge(self.pool.len()))?;
        self.pool.insert(container.clone(), idx);
        self.write_u8(CONTAINER_NEW)?;
        self.write_u8(container.kind().as_byte())?;
        self.write_str(container.name())?;
        self.write_str(container.root().as_str())
    }

    /// Writes a resource locator: its container, then its path.
    pub fn write_locator(&mut self, locator: &ResourceLocator) -> Result<(), StateError> {
        self.write_container(locator.container())?;
        self.write_str(locator.path())
    }
}

/// Reads state primitives from a byte stream.
#[derive(Debug)]
pub struct StateReader<R> {
    inner: R,
    pool: Vec<Arc<ResourceContainer>>,
}

impl<R: Read> StateReader<R> {
    /// Creates a reader with an empty container pool.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pool: Vec::new(),
        }
    }

    /// Fills `buf`, mapping a premature end of stream to
    /// [`StateError::Truncated`].
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), StateError> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => StateError::Truncated,
            _ => StateError::Io(e),
        })
    }

    /// Returns `true` when the stream has no more data.
    pub fn at_end(&mut self) -> Result<bool, StateError> {
        let mut probe = [0u8; 1];
        loop {
            match self.inner.read(&mut probe) {
                Ok(0) => return Ok(true),
                Ok(_) => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(StateError::Io(e)),
            }
        }
    }

    /// Reads one byte.
    pub fn read_u8(&mut self) -> Result<u8, StateError> {
        let mut buf = [0u8; 1];
        self.read_bytes(&mut buf)?;
        Ok(buf[0])
    }

    /// Reads a little-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, StateError> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Reads a little-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, StateError> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Reads a little-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, StateError> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(i64::from_le_bytes(buf))
    }

    /// Reads a `u32` count or length.
    pub fn read_count(&mut self) -> Result<usize, StateError> {
        let count = self.read_u32()?;
        usize::try_from(count).map_err(|_| StateError::TooLarge(usize::MAX))
    }

    /// Reads a length-prefixed UTF-8 string.
    ///
    /// The declared length is not trusted for allocation: a truncated stream
    /// fails after reading what is there.
    pub fn read_string(&mut self) -> Result<String, StateError> {
        let len = self.read_u32()?;
        let mut buf = Vec::new();
        (&mut self.inner).take(u64::from(len)).read_to_end(&mut buf)?;
        if buf.len() != len as usize {
            return Err(StateError::Truncated);
        }
        String::from_utf8(buf).map_err(|_| StateError::InvalidUtf8)
    }

    /// Reads an override kind byte.
    pub fn read_override_kind(&mut self) -> Result<ResourceOverrideKind, StateError> {
        let byte = self.read_u8()?;
        ResourceOverrideKind::from_byte(byte).ok_or(StateError::InvalidOverrideKind(byte))
    }

    /// Reads a timestamp.
    pub fn read_timestamp(&mut self) -> Result<Timestamp, StateError> {
        Ok(Timestamp::from_micros(self.read_i64()?))
    }

    /// Reads a container reference, resolving pooled ones.
    pub fn read_container(&mut self) -> Result<Arc<ResourceContainer>, StateError> {
        match self.read_u8()? {
            CONTAINER_NEW => {
                let byte = self.read_u8()?;
                let kind = ContainerKind::from_byte(byte)
                    .ok_or_else(|| StateError::InvalidContainerRef(format!("unknown kind {byte}")))?;
                let name = self.read_string()?;
                let root = self.read_string()?;
                let container = Arc::new(ResourceContainer::new(kind, name, root));
                self.pool.push(Arc::clone(&container));
                Ok(container)
            }
            CONTAINER_POOLED => {
                let idx = self.read_u32()?;
                self.pool
                    .get(idx as usize)
                    .cloned()
                    .ok_or_else(|| {
                        StateError::InvalidContainerRef(format!(
                            "pool index {idx} out of {} entries",
                            self.pool.len()
                        ))
                    })
            }
            tag => Err(StateError::InvalidContainerRef(format!("unknown tag {tag}"))),
        }
    }

    /// Reads a resource locator.
    pub fn read_locator(&mut self) -> Result<ResourceLocator, StateError> {
        let container = self.read_container()?;
        let path = self.read_string()?;
        Ok(ResourceLocator::new(container, path))
    }
}
