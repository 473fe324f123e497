//! Control-plane client for the RADOS Gateway admin interface.
//!
//! The [`AdminClient`] trait is the seam between the collection engine and
//! the cluster: every call carries a mandatory deadline, and the shipped
//! implementation ([`RgwAdminClient`]) shells out to `radosgw-admin`,
//! killing the child process when the deadline elapses.

mod admin;
mod parse;
mod traits;

pub use admin::{RgwAdminClient, DEFAULT_ADMIN_BINARY, DEFAULT_CEPH_CONF};
pub use parse::{parse_bucket_list, parse_bulk_stats, parse_single_stats, parse_sync_status};
pub use traits::{AdminClient, ClientError};
