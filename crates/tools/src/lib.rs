//! Tool implementations for CloudClaw.
//!
//! Tools let the assistant act on AWS: EC2 and S3 operations, cost analysis,
//! operation history and arbitrary AWS API commands, all served by the AWS
//! automation API. Extra tools can come from a remote tool server, and a few
//! built-ins need no backend at all.

pub mod aws_api;
pub mod clock;
pub mod remote;
pub mod source;

pub use aws_api::{AwsApiTool, AwsRoute, aws_catalog};
pub use clock::CurrentTimeTool;
pub use remote::{RemoteCatalogSource, RemoteTool};
pub use source::{CompositeSource, StaticSource, source_from_config};
