pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    dim, error, excerpt, file_heading, header, include_row, item_heading, muted, outline_row,
    section, success, warn,
};
pub use table::{summary_table, TableBuilder};
pub use theme::{theme, Theme};
