pub(crate) mod rpc;
pub(crate) mod torrents;
