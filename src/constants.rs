pub const JIKAN_API: &str = "https://api.jikan.moe/v4";

pub mod catalog {

    pub const PAGE_SIZE: u32 = 20;

    /// Jikan rejects `limit` values above this.
    pub const MAX_PAGE_SIZE: u32 = 25;

    pub const DEFAULT_ORDER_BY: &str = "score";

    pub const DEFAULT_SORT: &str = "desc";
}

pub mod score {

    pub const MIN: f64 = 0.0;

    pub const MAX: f64 = 10.0;

    pub const STEP: f64 = 0.5;
}

pub mod intervals {
    use std::time::Duration;

    pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

    pub const SCORE_DEBOUNCE: Duration = Duration::from_millis(300);

    /// Jikan allows roughly three requests per second.
    pub const JIKAN_REQUEST_SPACING: Duration = Duration::from_millis(350);
}

pub mod limits {

    pub const PREFETCH_THRESHOLD: usize = 3;

    pub const EVENT_BUFFER_SIZE: usize = 64;
}
