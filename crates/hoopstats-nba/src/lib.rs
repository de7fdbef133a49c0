// Library root: dataset reading, value cleaning, season handling and the
// transactional loader for NBA player-season stats.

pub mod clean;
pub mod dataset;
pub mod loader;
pub mod season;
