use anyhow::Result;

use super::GenerationOutcome;
use super::GenerationSession;
use super::GenerationStatus;
use crate::domain::models::EventKind;
use crate::domain::models::StreamEvent;

fn event(kind: EventKind, content: &str) -> StreamEvent {
    return StreamEvent::new(kind, content);
}

mod classify {
    use super::*;

    #[test]
    fn it_completes_with_counts() {
        let log = vec![
            event(EventKind::Info, "start"),
            event(EventKind::Progress, "5/10").with_counts(Some(5), None, Some(10)),
            event(EventKind::Complete, "done").with_counts(Some(9), Some(1), Some(10)),
        ];
        let outcome = GenerationOutcome::classify(&log);

        assert_eq!(outcome.status(), GenerationStatus::Completed);
        insta::assert_snapshot!(outcome.message(), @"答案生成完成！成功: 9, 失败: 1");
    }

    #[test]
    fn it_completes_without_counts() {
        let outcome = GenerationOutcome::classify(&[event(EventKind::Complete, "done")]);

        assert_eq!(
            outcome,
            GenerationOutcome::Completed {
                success_count: None,
                failed_count: None
            }
        );
        insta::assert_snapshot!(outcome.message(), @"答案生成完成！");
    }

    #[test]
    fn it_defaults_missing_counts_to_zero() {
        let log = vec![event(EventKind::Complete, "done").with_counts(Some(3), None, None)];
        let outcome = GenerationOutcome::classify(&log);

        insta::assert_snapshot!(outcome.message(), @"答案生成完成！成功: 3, 失败: 0");
    }

    #[test]
    fn it_uses_the_last_complete_event() {
        let log = vec![
            event(EventKind::Complete, "first").with_counts(Some(1), Some(0), None),
            event(EventKind::Info, "retrying"),
            event(EventKind::Complete, "second").with_counts(Some(4), Some(2), None),
            event(EventKind::Info, "bye"),
        ];
        let outcome = GenerationOutcome::classify(&log);

        assert_eq!(
            outcome,
            GenerationOutcome::Completed {
                success_count: Some(4),
                failed_count: Some(2)
            }
        );
    }

    #[test]
    fn it_keeps_complete_sticky_over_errors() {
        let before = vec![
            event(EventKind::Error, "boom"),
            event(EventKind::Complete, "done"),
        ];
        let after = vec![
            event(EventKind::Complete, "done"),
            event(EventKind::Error, "boom"),
        ];

        assert_eq!(
            GenerationOutcome::classify(&before).status(),
            GenerationStatus::Completed
        );
        assert_eq!(
            GenerationOutcome::classify(&after).status(),
            GenerationStatus::Completed
        );
    }

    #[test]
    fn it_reports_no_response_for_empty_log() {
        let outcome = GenerationOutcome::classify(&[]);

        assert_eq!(outcome, GenerationOutcome::NoResponse);
        assert_eq!(outcome.status(), GenerationStatus::Idle);
        insta::assert_snapshot!(outcome.message(), @"生成失败：未收到服务器响应，请检查网络连接或后端服务");
    }

    #[test]
    fn it_reports_errors() {
        let outcome = GenerationOutcome::classify(&[event(EventKind::Error, "boom")]);

        assert_eq!(outcome, GenerationOutcome::Errored);
        assert_eq!(outcome.status(), GenerationStatus::Idle);
        insta::assert_snapshot!(outcome.message(), @"生成过程中出现错误，请查看详情");
    }

    #[test]
    fn it_reports_interruptions() {
        let log = vec![
            event(EventKind::Info, "start"),
            event(EventKind::Progress, "1/10"),
        ];
        let outcome = GenerationOutcome::classify(&log);

        assert_eq!(outcome, GenerationOutcome::Interrupted);
        assert_eq!(outcome.status(), GenerationStatus::Idle);
        insta::assert_snapshot!(outcome.message(), @"生成中断：请查看上方日志了解详情");
    }

    #[test]
    fn it_uses_transport_error_messages() {
        let outcome = GenerationOutcome::TransportFailed("connection reset".to_string());
        assert_eq!(outcome.status(), GenerationStatus::Idle);
        assert_eq!(outcome.message(), "connection reset");

        let outcome = GenerationOutcome::TransportFailed("".to_string());
        assert_eq!(outcome.message(), "生成答案失败");
    }
}

mod session {
    use super::*;

    #[test]
    fn it_starts_idle() {
        let session = GenerationSession::default();

        assert_eq!(session.status(), GenerationStatus::Idle);
        assert!(session.log().is_empty());
        assert_eq!(session.message(), None);
    }

    #[test]
    fn it_runs_to_completion() -> Result<()> {
        let mut session = GenerationSession::default();
        session.begin()?;
        assert_eq!(session.status(), GenerationStatus::Running);

        session.record(event(EventKind::Info, "start"))?;
        session.record(event(EventKind::Complete, "done").with_counts(Some(1), Some(0), None))?;
        let outcome = session.finish();

        assert_eq!(outcome.status(), GenerationStatus::Completed);
        assert_eq!(session.status(), GenerationStatus::Completed);
        assert_eq!(session.log().len(), 2);
        assert_eq!(session.message(), Some("答案生成完成！成功: 1, 失败: 0"));

        return Ok(());
    }

    #[test]
    fn it_refuses_to_begin_twice() -> Result<()> {
        let mut session = GenerationSession::default();
        session.begin()?;

        assert!(session.begin().is_err());
        assert_eq!(session.status(), GenerationStatus::Running);

        return Ok(());
    }

    #[test]
    fn it_refuses_to_record_when_not_running() {
        let mut session = GenerationSession::default();

        assert!(session.record(event(EventKind::Info, "start")).is_err());
        assert!(session.log().is_empty());
    }

    #[test]
    fn it_resets_log_on_new_run() -> Result<()> {
        let mut session = GenerationSession::default();
        session.begin()?;
        session.record(event(EventKind::Info, "first run"))?;
        session.finish();

        session.begin()?;
        assert!(session.log().is_empty());
        assert_eq!(session.message(), None);

        return Ok(());
    }

    #[test]
    fn it_fails_back_to_idle_on_transport_errors() -> Result<()> {
        let mut session = GenerationSession::default();
        session.begin()?;
        session.record(event(EventKind::Complete, "done"))?;
        let outcome = session.fail("connection reset by peer");

        assert_eq!(
            outcome,
            GenerationOutcome::TransportFailed("connection reset by peer".to_string())
        );
        assert_eq!(session.status(), GenerationStatus::Idle);
        assert_eq!(session.message(), Some("connection reset by peer"));

        return Ok(());
    }

    #[test]
    fn it_clears_the_log() -> Result<()> {
        let mut session = GenerationSession::default();
        session.begin()?;
        assert!(session.clear().is_err());

        session.record(event(EventKind::Complete, "done"))?;
        session.finish();
        session.clear()?;

        assert_eq!(session.status(), GenerationStatus::Idle);
        assert!(session.log().is_empty());
        assert_eq!(session.message(), None);

        return Ok(());
    }
}
