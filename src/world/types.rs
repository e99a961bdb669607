/*!
 * Process Group Types
 * Errors and results for the process-group layer
 */

use crate::core::bincode::BincodeError;
use crate::core::types::{Address, GroupId, HandlerId, ProcessId};
use miette::Diagnostic;
use thiserror::Error;

/// Process-group operation result
pub type WorldResult<T> = Result<T, WorldError>;

/// Process-group errors
#[derive(Error, Debug, Diagnostic)]
pub enum WorldError {
    #[error("Unknown process group: {0}")]
    #[diagnostic(
        code(world::unknown_group),
        help("The group must be registered with this process's GroupRegistry before references from it arrive.")
    )]
    UnknownGroup(GroupId),

    #[error("Unknown process rank: {0}")]
    #[diagnostic(code(world::unknown_process))]
    UnknownProcess(ProcessId),

    #[error("No handler registered for id {0}")]
    #[diagnostic(code(world::no_handler))]
    NoHandler(HandlerId),

    #[error("Handler {0} is already registered")]
    #[diagnostic(code(world::handler_exists))]
    HandlerExists(HandlerId),

    #[error("Double release of remote reference at {addr:#x}")]
    #[diagnostic(
        code(world::double_release),
        help("Each distinct reference must be released exactly once across the whole group.")
    )]
    DoubleRelease { addr: Address },

    #[error("Address {addr:#x} is not exported by this process")]
    #[diagnostic(code(world::not_exported))]
    NotExported { addr: Address },

    #[error("Type mismatch: expected {expected}, found {found}")]
    #[diagnostic(code(world::type_mismatch))]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Operation on a null remote reference")]
    #[diagnostic(code(world::null_reference))]
    NullReference,

    #[error("Process {0} is disconnected")]
    #[diagnostic(code(world::disconnected))]
    Disconnected(ProcessId),

    #[error("Payload codec error: {0}")]
    #[diagnostic(code(world::codec))]
    Codec(#[from] BincodeError),
}
