//! CSV export of workout sessions.

use crate::recording::types::{ExportError, ExportFormat};
use crate::workouts::types::WorkoutSession;
use std::io::Write;

/// Export a session's strain trace to CSV.
pub fn export_points_csv(session: &WorkoutSession) -> Result<String, ExportError> {
    if session.points.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut output = Vec::new();

    writeln!(output, "elapsed_ms,strain").map_err(|e| ExportError::WriteFailed(e.to_string()))?;

    for point in &session.points {
        writeln!(output, "{},{}", point.elapsed_ms, point.strain)
            .map_err(|e| ExportError::WriteFailed(e.to_string()))?;
    }

    String::from_utf8(output).map_err(|e| ExportError::WriteFailed(e.to_string()))
}

/// Export session summaries to CSV, one row per session.
pub fn export_sessions_csv(sessions: &[WorkoutSession]) -> Result<String, ExportError> {
    if sessions.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut output = Vec::new();

    writeln!(
        output,
        "id,date,sets,reps,recovery_seconds,strain_per_set,strain_per_rep,max_strain,points"
    )
    .map_err(|e| ExportError::WriteFailed(e.to_string()))?;

    for session in sessions {
        writeln!(
            output,
            "{},{},{},{},{},{},{},{},{}",
            session.id,
            session.date.to_rfc3339(),
            session.sets,
            session.reps,
            session.recovery_seconds,
            session.strain_per_set,
            session.strain_per_rep,
            session.max_strain,
            session.points.len(),
        )
        .map_err(|e| ExportError::WriteFailed(e.to_string()))?;
    }

    String::from_utf8(output).map_err(|e| ExportError::WriteFailed(e.to_string()))
}

/// Export a session's strain trace and write it to a file.
pub fn export_points_csv_to_file(
    session: &WorkoutSession,
    path: &std::path::Path,
) -> Result<(), ExportError> {
    let content = export_points_csv(session)?;
    std::fs::write(path, content)?;
    tracing::info!("Exported {} to {:?}", ExportFormat::PointsCsv, path);
    Ok(())
}

/// Export session summaries and write them to a file.
pub fn export_sessions_csv_to_file(
    sessions: &[WorkoutSession],
    path: &std::path::Path,
) -> Result<(), ExportError> {
    let content = export_sessions_csv(sessions)?;
    std::fs::write(path, content)?;
    tracing::info!(
        "Exported {} of {} sessions to {:?}",
        ExportFormat::SummaryCsv,
        sessions.len(),
        path
    );
    Ok(())
}

/// Generate a default filename for a session CSV export.
pub fn generate_csv_filename(session: &WorkoutSession) -> String {
    let timestamp = session.date.format("%Y%m%d_%H%M%S");
    format!("StrainSense_{}.csv", timestamp)
}
