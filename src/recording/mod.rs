//! Recording module for exporting finalized workout sessions.

pub mod exporter_csv;
pub mod types;

pub use exporter_csv::{
    export_points_csv, export_points_csv_to_file, export_sessions_csv,
    export_sessions_csv_to_file, generate_csv_filename,
};
pub use types::{ExportError, ExportFormat};
