mod browse;
mod genres;

pub use browse::cmd_browse;
pub use genres::cmd_genres;
