//! Domain types shared by every node
//!
//! - [`Grid`] - the toroidal cell grid
//! - [`Band`] / [`Task`] - row ranges and their halo-wrapped work units

mod band;
mod grid;

pub use band::{Band, Task, partition};
pub use grid::{Cell, Grid, GridError, Row, next_state, rows_codec};
