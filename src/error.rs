//! Error taxonomy shared by the arena, the index and the table.

use crate::arena::Handle;

#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    /// The arena or the index could not grow. The table is left exactly as
    /// it was before the failing call.
    #[error("out of memory")]
    OutOfMemory,
    /// The handle was not issued by this table instance.
    #[error("handle {0:?} was not issued by this table")]
    InvalidHandle(Handle),
    #[error("invalid table configuration: {0}")]
    InvalidConfig(&'static str),
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Error {
        Error::OutOfMemory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_reserve_failure_maps_to_out_of_memory() {
        let mut v: Vec<u8> = Vec::new();
        let reserve_err = v.try_reserve(isize::MAX as usize + 1).unwrap_err();
        assert_eq!(Error::from(reserve_err), Error::OutOfMemory);
    }

    #[test]
    fn messages_are_readable() {
        assert_eq!(Error::OutOfMemory.to_string(), "out of memory");
        assert_eq!(
            Error::InvalidConfig("max_load_factor must be in (0, 1)").to_string(),
            "invalid table configuration: max_load_factor must be in (0, 1)"
        );
    }
}
