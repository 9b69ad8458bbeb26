//! Mutable per-client session state.

/// Request identifiers wrap back to zero on reaching this value.
pub const REQUEST_ID_CEILING: u32 = 1024;

/// Cookie and request counter shared by every call made through one client.
#[derive(Debug, Default)]
pub(crate) struct Session {
    cookie: String,
    next_request_id: u32,
}

impl Session {
    /// Snapshot the current id and advance the counter, wrapping at the ceiling.
    pub(crate) const fn take_request_id(&mut self) -> u32 {
        let id = self.next_request_id;
        self.next_request_id = (id + 1) % REQUEST_ID_CEILING;
        id
    }

    pub(crate) fn cookie(&self) -> &str {
        &self.cookie
    }

    pub(crate) fn set_cookie(&mut self, cookie: String) {
        self.cookie = cookie;
    }
}
