//! Moderation hook: where `report_user` submissions go.
//!
//! Reports have no in-room effect — they are forwarded verbatim to the
//! external moderation/storage collaborator and the game carries on.

use faceoff_protocol::RoomCode;

use crate::SessionError;

/// One user report as submitted by a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserReport {
    pub room: RoomCode,
    pub message: String,
    pub reporter_name: String,
}

/// Receives user reports.
pub trait ReportSink: Send + Sync + 'static {
    /// Forwards a report to the moderation collaborator.
    fn submit(
        &self,
        report: UserReport,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Development sink: reports go to the log and nowhere else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReportSink;

impl ReportSink for LogReportSink {
    async fn submit(&self, report: UserReport) -> Result<(), SessionError> {
        tracing::warn!(
            room = %report.room,
            reporter = %report.reporter_name,
            message = %report.message,
            "user report received"
        );
        Ok(())
    }
}
