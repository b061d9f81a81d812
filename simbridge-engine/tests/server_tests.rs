use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use simbridge_engine::{CompileError, EngineServer, LineScript, ScriptEngine};
use simbridge_protocol::channel::mock::MockChannel;
use simbridge_protocol::{
    CallFault, CallReply, Frame, FrameChannel, MessageTag, RunScriptMessage, TcpTransport,
};
use simbridge_types::{BuildingData, EntityKind, PropData, Snapshot, TreeData, Vector};
use std::thread;

fn run_frame(script: &str) -> Frame {
    Frame::new(&MessageTag::ScriptRun, &RunScriptMessage::new(script)).unwrap()
}

fn reply_ok(value: Value) -> Frame {
    Frame::new(&MessageTag::CallReturn, &CallReply::Ok(value)).unwrap()
}

fn reply_snapshot<T: Snapshot>(snapshot: &T) -> Frame {
    reply_ok(serde_json::to_value(snapshot).unwrap())
}

fn reply_fault(fault: CallFault) -> Frame {
    Frame::new(&MessageTag::CallReturn, &CallReply::Fault(fault)).unwrap()
}

fn server() -> EngineServer<LineScript> {
    EngineServer::bind("127.0.0.1:0", LineScript).unwrap()
}

/// Serves everything queued on `host` and returns what the engine sent,
/// as (tag, text) pairs.
fn serve(host: &MockChannel) -> Vec<(String, String)> {
    server().serve_connection(Box::new(host.clone())).unwrap();
    host.drain_outgoing()
        .into_iter()
        .map(|f| {
            let text = f.text();
            (f.tag, text)
        })
        .collect()
}

fn pair(tag: &str, text: &str) -> (String, String) {
    (tag.to_string(), text.to_string())
}

// ── Compile ─────────────────────────────────────────────────────

#[test]
fn compile_skips_blank_lines_and_comments() {
    let program = LineScript
        .compile("# setup\n\nprint hi\n   \nbuilding 3\n")
        .unwrap();
    assert_eq!(program.len(), 2);
}

#[test]
fn compile_reports_line_of_unknown_command() {
    let err = LineScript.compile("print ok\nfly away").unwrap_err();
    assert_eq!(
        err,
        CompileError("SyntaxError: line 2: unknown command 'fly'".into())
    );
}

#[test]
fn compile_rejects_malformed_arguments() {
    for source in [
        "building",
        "building 70000",
        "tree -1",
        "move tree 1 2",
        "height 1 north",
        "delete castle 3",
        "create_prop Bench 1 2",
        "height 1 NaN",
    ] {
        let err = LineScript.compile(source).unwrap_err();
        assert!(err.0.starts_with("SyntaxError: line 1"), "{source}: {err}");
    }
}

#[test]
fn tree_ids_are_wide() {
    assert!(LineScript.compile("tree 70000").is_ok());
}

// ── Runs over a mock channel ────────────────────────────────────

#[test]
fn empty_script_ends_without_output() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame(""));
    assert_eq!(serve(&host), vec![pair("c_script_end", "")]);
}

#[test]
fn print_is_forwarded_before_end() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame("print hello world\nprint second"));
    assert_eq!(
        serve(&host),
        vec![
            pair("c_output_message", "hello world"),
            pair("c_output_message", "second"),
            pair("c_script_end", ""),
        ]
    );
}

#[test]
fn raise_ends_with_exception() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame("print before\nraise ZeroDivisionError: division by zero\nprint after"));
    assert_eq!(
        serve(&host),
        vec![
            pair("c_output_message", "before"),
            pair("c_exception", "ZeroDivisionError: division by zero"),
        ]
    );
}

#[test]
fn syntax_error_makes_no_calls() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame("building 42\nbuilding"));
    assert_eq!(
        serve(&host),
        vec![pair(
            "c_failed_to_compile",
            "SyntaxError: line 2: 'building' takes exactly one id"
        )]
    );
}

#[test]
fn repeated_lookup_is_served_from_cache() {
    let host = MockChannel::new();
    let hotel = BuildingData::new(42, Vector::new(1.0, 2.0, 3.0), "Hotel", 0.0);
    host.queue_incoming(run_frame("building 42\nbuilding 42"));
    host.queue_incoming(reply_snapshot(&hotel));

    let line = "building 42 'Hotel' at (1.00, 2.00, 3.00)";
    assert_eq!(
        serve(&host),
        vec![
            pair("c_callfunc_get_object", r#"{"id":42,"type":"building"}"#),
            pair("c_output_message", line),
            pair("c_output_message", line),
            pair("c_script_end", ""),
        ]
    );
}

#[test]
fn cache_survives_between_runs_of_one_connection() {
    let host = MockChannel::new();
    let oak = TreeData::new(7, Vector::xz(4.0, 4.0), "Oak");
    host.queue_incoming(run_frame("tree 7"));
    host.queue_incoming(reply_snapshot(&oak));
    host.queue_incoming(run_frame("tree 7"));

    let sent = serve(&host);
    let calls = sent.iter().filter(|(tag, _)| tag.starts_with("c_callfunc_")).count();
    let ends = sent.iter().filter(|(tag, _)| tag == "c_script_end").count();
    assert_eq!(calls, 1);
    assert_eq!(ends, 2);
}

#[test]
fn async_reply_is_consumed_before_terminal_frame() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame("refresh tree 7"));
    host.queue_incoming(reply_snapshot(&TreeData::new(7, Vector::zero(), "Oak")));

    let sent = serve(&host);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "c_callfunc_get_object");
    assert_eq!(sent[1].0, "c_script_end");
    assert_eq!(host.pending_incoming(), 0);
}

#[test]
fn host_fault_becomes_script_exception() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame("create_prop Bench 1 2 0\nprint unreachable"));
    host.queue_incoming(reply_fault(CallFault::prefab_not_found("Bench")));

    let sent = serve(&host);
    assert_eq!(
        sent.last().unwrap(),
        &pair("c_exception", "HostError: Prefab 'Bench' not found")
    );
    assert_eq!(sent.len(), 2);
}

#[test]
fn faulted_delete_stops_the_run_at_the_next_statement() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame("delete building 1\nprint after"));
    host.queue_incoming(reply_fault(CallFault::internal("building is protected")));

    let sent = serve(&host);
    let tags: Vec<&str> = sent.iter().map(|(tag, _)| tag.as_str()).collect();
    assert_eq!(tags, vec!["c_callfunc_delete_object", "c_exception"]);
    assert_eq!(sent[1], pair("c_exception", "HostError: building is protected"));
    assert_eq!(host.pending_incoming(), 0);
}

#[test]
fn faulted_refresh_as_last_statement_ends_in_exception() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame("refresh building 1"));
    host.queue_incoming(reply_fault(CallFault::not_found(EntityKind::Building, 1)));

    let sent = serve(&host);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "c_callfunc_get_object");
    assert_eq!(
        sent[1],
        pair("c_exception", "HostError: building 1 does not exist")
    );
}

#[test]
fn async_fault_does_not_leak_into_the_next_run() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame("refresh tree 7"));
    host.queue_incoming(reply_fault(CallFault::internal("simulation busy")));
    host.queue_incoming(run_frame("print fine"));

    let sent = serve(&host);
    assert_eq!(
        &sent[1..],
        &[
            pair("c_exception", "HostError: simulation busy"),
            pair("c_output_message", "fine"),
            pair("c_script_end", ""),
        ]
    );
}

#[test]
fn queries_print_their_results() {
    let host = MockChannel::new();
    let bench = PropData::new(3, Vector::new(1.0, 0.5, 2.0), "Bench", 0.0);
    host.queue_incoming(run_frame("exists Bench\nheight 1 2\ncreate_prop Bench 1 2 0"));
    host.queue_incoming(reply_ok(json!(true)));
    host.queue_incoming(reply_ok(json!(12.5)));
    host.queue_incoming(reply_snapshot(&bench));

    let outputs: Vec<String> = serve(&host)
        .into_iter()
        .filter(|(tag, _)| tag == "c_output_message")
        .map(|(_, text)| text)
        .collect();
    assert_eq!(
        outputs,
        vec!["true", "12.50", "prop 3 'Bench' at (1.00, 0.50, 2.00)"]
    );
}

#[test]
fn deleted_entity_prints_as_deleted() {
    let host = MockChannel::new();
    host.queue_incoming(run_frame("delete tree 9\ntree 9"));
    host.queue_incoming(reply_snapshot(&TreeData::tombstone(9)));

    let sent = serve(&host);
    assert_eq!(sent[0].0, "c_callfunc_delete_object");
    assert_eq!(sent[1], pair("c_output_message", "tree 9 (deleted)"));
}

#[test]
fn idle_frames_other_than_run_are_ignored() {
    let host = MockChannel::new();
    host.queue_incoming(Frame::raw("c_unexpected", Value::Null));
    host.queue_incoming(run_frame("print ok"));
    assert_eq!(
        serve(&host),
        vec![pair("c_output_message", "ok"), pair("c_script_end", "")]
    );
}

// ── Real socket ─────────────────────────────────────────────────

#[test]
fn serves_a_run_over_tcp() {
    let server = server();
    let addr = server.local_addr().unwrap();
    let engine = thread::spawn(move || server.serve_next());

    let mut host = TcpTransport::connect(addr).unwrap();
    host.send_frame(&run_frame("print over tcp")).unwrap();
    assert_eq!(host.receive().unwrap().text(), "over tcp");
    assert_eq!(host.receive().unwrap().tag, "c_script_end");
    host.shutdown();

    engine.join().unwrap().unwrap();
}
