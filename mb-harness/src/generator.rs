//! Random test message generation.

use mb_types::TestMessage;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashSet;

/// Errors from [`generate_messages`].
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The entropy source failed.
    #[error("could not generate random message id: {0}")]
    Entropy(#[from] rand::Error),

    /// Zero-length ids cannot be distinct.
    #[error("cannot generate {count} distinct messages with zero-length ids")]
    ZeroLength {
        /// Requested message count.
        count: usize,
    },

    /// More messages requested than distinct ids exist.
    #[error("cannot generate {count} distinct messages from {byte_length} random bytes each")]
    KeyspaceTooSmall {
        /// Requested message count.
        count: usize,
        /// Random bytes per id.
        byte_length: usize,
    },
}

/// A set of test messages with pairwise-distinct ids.
#[derive(Debug, Clone, Default)]
pub struct TestMessageSet {
    messages: Vec<TestMessage>,
}

impl TestMessageSet {
    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Iterate in generation order.
    pub fn iter(&self) -> std::slice::Iter<'_, TestMessage> {
        self.messages.iter()
    }

    /// Borrow as a slice.
    pub fn as_slice(&self) -> &[TestMessage] {
        &self.messages
    }

    /// Take the messages out.
    pub fn into_vec(self) -> Vec<TestMessage> {
        self.messages
    }

    /// Messages ordered ascending by id.
    pub fn sorted(&self) -> Vec<TestMessage> {
        let mut sorted = self.messages.clone();
        sorted.sort();
        sorted
    }
}

impl<'a> IntoIterator for &'a TestMessageSet {
    type Item = &'a TestMessage;
    type IntoIter = std::slice::Iter<'a, TestMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

/// Generate `count` distinct messages with ids of `byte_length` random bytes
/// drawn from the OS entropy source.
pub fn generate_messages(count: usize, byte_length: usize) -> Result<TestMessageSet, GenerationError> {
    generate_messages_with(&mut OsRng, count, byte_length)
}

/// Like [`generate_messages`] but with a caller-supplied generator.
pub fn generate_messages_with<R: RngCore + ?Sized>(
    rng: &mut R,
    count: usize,
    byte_length: usize,
) -> Result<TestMessageSet, GenerationError> {
    if count > 1 && byte_length == 0 {
        return Err(GenerationError::ZeroLength { count });
    }
    if !keyspace_fits(count, byte_length) {
        return Err(GenerationError::KeyspaceTooSmall { count, byte_length });
    }

    let mut seen = HashSet::with_capacity(count);
    let mut messages = Vec::with_capacity(count);
    let mut buf = vec![0u8; byte_length];

    while messages.len() < count {
        rng.try_fill_bytes(&mut buf)?;
        let id = hex::encode(&buf);
        // Collisions are resampled.
        if seen.insert(id.clone()) {
            messages.push(TestMessage::new(id));
        }
    }

    Ok(TestMessageSet { messages })
}

/// Whether `256^byte_length >= count`.
fn keyspace_fits(count: usize, byte_length: usize) -> bool {
    if byte_length >= std::mem::size_of::<usize>() {
        return true;
    }
    let keyspace = 1usize << (8 * byte_length);
    count <= keyspace
}
