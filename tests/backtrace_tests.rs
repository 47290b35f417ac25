mod common;

use b9_unwind::decorate::{Decorated, InterpFrameFilter};
use b9_unwind::error::UnwindError;
use b9_unwind::host::{FrameDecorator, FrameId, ThreadId};
use b9_unwind::snapshot::{self, Address, BacktraceFrame, SnapshotTarget};
use b9_unwind::unwinder::InterpUnwinder;
use b9_unwind::value::{read_tagged, CallRecord, Slot, Tag, PAYLOAD_MASK};
use common::*;
use pretty_assertions::assert_eq;

#[cfg(test)]
mod decoder_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pointer_payload_is_masked() {
        let slot = Slot(0xfffa_0000_7ffe_e000);
        assert_eq!(slot.tag(), Tag::Ptr);
        assert_eq!(slot.as_ptr(), Some(0x7ffe_e000));
        assert_eq!(slot.expect(Tag::Ptr), Ok(slot.0 & PAYLOAD_MASK));
    }

    #[test]
    fn test_mismatched_tag_is_rejected() {
        let slot = Slot(0xfff9_0000_0000_0fc8);
        assert_eq!(slot.as_ptr(), None);
        assert_eq!(slot.expect(Tag::Ptr), Err(Tag::Uint48));
        assert_eq!(slot.as_uint48(), Some(0xfc8));
    }

    #[test]
    fn test_doubles_never_decode_as_fields() {
        let slot = Slot(1.5f64.to_bits());
        assert_eq!(slot.tag(), Tag::Double);
        assert_eq!(slot.expect(Tag::Double), Err(Tag::Double));
        assert_eq!(slot.as_ptr(), None);
    }

    #[test]
    fn test_int48_is_sign_extended() {
        assert_eq!(Slot::boxed(Tag::Int48, (-5i64) as u64).as_int48(), Some(-5));
        assert_eq!(Slot::boxed(Tag::Int48, 42).as_int48(), Some(42));
    }

    #[test]
    fn test_unknown_tags_are_kept() {
        assert_eq!(Slot(0xfffe_0000_0000_0001).tag(), Tag::Unknown(0xfffe));
    }

    #[test]
    fn test_read_tagged_reports_address() {
        let target = nested_call_target();
        // call type slot of the inner call record
        let err = read_tagged(&target, INNER_BP - 8, Tag::Ptr).unwrap_err();
        match err {
            UnwindError::TagMismatch {
                addr,
                expected,
                found,
            } => {
                assert_eq!(addr, INNER_BP - 8);
                assert_eq!(expected, Tag::Ptr);
                assert_eq!(found, Tag::Uint48);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_call_record() {
        let target = nested_call_target();
        let record = CallRecord::read_below(&target, INNER_BP).expect("record decodes");
        assert_eq!(
            record,
            CallRecord {
                function: 2,
                caller_ip: 0xfc8,
                caller_bp: OUTER_BP,
                call_type: 0,
            }
        );
        assert_eq!(CallRecord::caller_sp(INNER_BP), INNER_BP - 32);
    }

    #[test]
    fn test_call_record_unmapped() {
        let target = nested_call_target();
        assert!(matches!(
            CallRecord::read_below(&target, 0x1000),
            Err(UnwindError::Host(_))
        ));
    }
}

#[cfg(test)]
mod traversal_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_backtrace_through_interpreter() {
        let target = nested_call_target();
        let mut unwinder = InterpUnwinder::default();
        let frames = snapshot::backtrace(&target, &mut unwinder, ThreadId(1)).expect("thread 1");

        let summary: Vec<_> = frames
            .iter()
            .map(|frame| (frame.level, frame.pc, frame.sp, frame.function.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, INTERPRET_PC, NATIVE_SP, Some("b9::ExecutionContext::interpret")),
                (1, 0x1000, INNER_TOP, None),
                (2, 0xfc8, INNER_BP - 32, None),
                (3, INTERPRET_PC, NATIVE_SP, Some("b9::ExecutionContext::interpret")),
                (4, 0x402050, 0x7fffffffd050, Some("b9::VirtualMachine::run")),
                (5, 0x401020, 0x7fffffffd090, Some("main")),
            ]
        );
        assert_eq!(frames[0].id, FrameId::new(INNER_TOP, 0x1000));
        assert_eq!(frames[3].id, FrameId::new(NATIVE_SP, INTERPRET_PC));
    }

    #[test]
    fn test_frame_identities_are_unique() {
        let target = nested_call_target();
        let mut unwinder = InterpUnwinder::default();
        let frames = snapshot::backtrace(&target, &mut unwinder, ThreadId(1)).expect("thread 1");

        for (i, a) in frames.iter().enumerate() {
            for b in &frames[i + 1..] {
                assert_ne!(a.id, b.id, "frames #{} and #{} share an identity", a.level, b.level);
            }
        }
    }

    #[test]
    fn test_truncated_chain_keeps_reachable_frames() {
        let mut recorded = nested_call_snapshot();
        recorded.stops[0].memory[2].words[2] = Address(0x3ff0_0000_0000_0000);
        let target = SnapshotTarget::new(recorded);
        let mut unwinder = InterpUnwinder::default();

        let frames = snapshot::backtrace(&target, &mut unwinder, ThreadId(1)).expect("thread 1");
        let summary: Vec<_> = frames
            .iter()
            .map(|frame| (frame.pc, frame.function.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (INTERPRET_PC, Some("b9::ExecutionContext::interpret")),
                (0x1000, None),
                (INTERPRET_PC, Some("b9::ExecutionContext::interpret")),
                (0x402050, Some("b9::VirtualMachine::run")),
                (0x401020, Some("main")),
            ]
        );
        assert_eq!(unwinder.frame_chain(ThreadId(1)).map(|chain| chain.len()), Some(1));
    }

    #[test]
    fn test_mistagged_caller_bp_keeps_native_callers() {
        let mut recorded = nested_call_snapshot();
        // caller bp of the inner call record, tagged as an integer
        recorded.stops[0].memory[2].words[2] = Address(0xfff9_0000_7ffe_d040);
        let target = SnapshotTarget::new(recorded);
        let mut unwinder = InterpUnwinder::default();

        let frames = snapshot::backtrace(&target, &mut unwinder, ThreadId(1)).expect("thread 1");
        let functions: Vec<_> = frames
            .iter()
            .filter_map(|frame| frame.function.as_deref())
            .collect();
        assert!(functions.contains(&"b9::VirtualMachine::run"));
        assert_eq!(functions.last(), Some(&"main"));
    }

    #[test]
    fn test_native_only_thread() {
        let target = nested_call_target();
        let mut unwinder = InterpUnwinder::default();
        let frames = snapshot::backtrace(&target, &mut unwinder, ThreadId(2)).expect("thread 2");

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].function.as_deref(), Some("main"));
        assert!(unwinder.session(ThreadId(2)).is_none());
    }

    #[test]
    fn test_unknown_thread() {
        let target = nested_call_target();
        let mut unwinder = InterpUnwinder::default();
        assert!(snapshot::backtrace(&target, &mut unwinder, ThreadId(9)).is_none());
    }
}

#[cfg(test)]
mod decoration_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolved(thread: u64) -> (Vec<BacktraceFrame>, InterpUnwinder) {
        let target = nested_call_target();
        let mut unwinder = InterpUnwinder::default();
        let frames = snapshot::backtrace(&target, &mut unwinder, ThreadId(thread))
            .expect("thread exists");
        (frames, unwinder)
    }

    #[test]
    fn test_interpreter_frames_are_labeled() {
        let (frames, unwinder) = resolved(1);
        let filter = InterpFrameFilter::new("B9 interpreted function");

        let decorated: Vec<_> = filter
            .filter(frames.clone(), unwinder.frame_chain(ThreadId(1)))
            .collect();

        let labeled: Vec<_> = decorated
            .iter()
            .filter(|frame| frame.is_interpreter())
            .map(|frame| frame.level())
            .collect();
        assert_eq!(labeled, vec![1, 2]);
        assert_eq!(decorated[1].function().as_deref(), Some("B9 interpreted function"));
        assert_eq!(decorated[4].function().as_deref(), Some("b9::VirtualMachine::run"));
        assert!(decorated[1].describe().contains("in B9 interpreted function (sp=0x7ffee100)"));

        let inner: Vec<_> = decorated.into_iter().map(Decorated::into_inner).collect();
        assert_eq!(inner, frames);
    }

    #[test]
    fn test_no_session_passes_frames_through() {
        let (frames, unwinder) = resolved(2);
        let filter = InterpFrameFilter::new("B9 interpreted function");

        let decorated: Vec<_> = filter
            .filter(frames.clone(), unwinder.frame_chain(ThreadId(2)))
            .collect();

        let expected: Vec<_> = frames.into_iter().map(Decorated::Plain).collect();
        assert_eq!(decorated, expected);
    }

    #[test]
    fn test_frames_without_vm_activity_are_unmodified() {
        let (frames, unwinder) = resolved(1);
        let native: Vec<_> = frames.into_iter().filter(|frame| frame.function.is_some()).collect();
        let filter = InterpFrameFilter::new("B9 interpreted function");

        let decorated: Vec<_> = filter
            .filter(native.clone(), unwinder.frame_chain(ThreadId(1)))
            .collect();

        assert_eq!(decorated.len(), native.len());
        assert!(decorated.iter().all(|frame| !frame.is_interpreter()));
        assert_eq!(
            decorated.into_iter().map(Decorated::into_inner).collect::<Vec<_>>(),
            native
        );
    }

    #[test]
    fn test_disabled_filter() {
        let (frames, unwinder) = resolved(1);
        let mut filter = InterpFrameFilter::new("B9 interpreted function");
        filter.enabled = false;

        assert!(filter
            .filter(frames, unwinder.frame_chain(ThreadId(1)))
            .all(|frame| !frame.is_interpreter()));
    }
}
