use thiserror::Error;

/// Errors that can occur when requesting memory from a pool.
///
/// Only failures of the underlying system allocator are recoverable and surface here. Usage
/// errors - rebinding a pool that has served an allocation, or configuring a chunk that cannot
/// fit in a block - are contract violations and panic instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The system allocator could not supply a new block of chunk-backing memory.
    ///
    /// The pool remains usable: chunks already carved stay valid and a later allocation may
    /// succeed once memory pressure subsides.
    #[error("the system allocator failed to supply a new {block_size}-byte block")]
    BlockAllocationFailed {
        /// Size in bytes of the block that was requested.
        block_size: usize,
    },

    /// The system allocator could not satisfy a bulk request that bypassed the pool.
    ///
    /// Multi-chunk requests are never served from pool blocks; they go directly to the system
    /// allocator and report their failures through this variant.
    #[error("the system allocator failed a bulk allocation of {size} bytes")]
    BulkAllocationFailed {
        /// Total size in bytes of the bulk request.
        size: usize,
    },
}

/// A specialized `Result` type for pool operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn block_allocation_failure_is_error() {
        let error = Error::BlockAllocationFailed { block_size: 4096 };

        // Verify it is a valid Error that can be used in Result context.
        let result: Result<()> = Err(error);
        assert!(result.is_err());
    }

    #[test]
    fn messages_name_the_request_size() {
        let error = Error::BlockAllocationFailed { block_size: 4096 };
        assert!(error.to_string().contains("4096"));

        let error = Error::BulkAllocationFailed { size: 640 };
        assert!(error.to_string().contains("640"));
    }
}
