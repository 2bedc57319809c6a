pub mod url_validation;

pub use url_validation::{
    BlockReason, HostLookup, LookupFuture, PublicAddressResolver, StaticLookup, SystemLookup,
    check_public_url, is_private_host, is_private_ip,
};
