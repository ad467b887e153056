//! Execution of compiled sessions: deployment and entry point calls over
//! JSON-RPC, and decoding of the returned data into displayable values.

pub mod abi;
pub mod rpc;
pub mod value;

pub use abi::{AbiError, AbiType};
pub use rpc::{ExecError, ExecutionService, HttpTransport, RpcExecutor, RpcOptions, Transport};
pub use value::Value;
