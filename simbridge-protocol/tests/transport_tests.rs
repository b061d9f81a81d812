use simbridge_protocol::channel::mock::MockChannel;
use simbridge_protocol::{Frame, FrameChannel, MessageTag, ProtocolError, TcpTransport};
use std::net::TcpListener;
use std::thread;

// ── MockChannel ─────────────────────────────────────────────────

#[test]
fn mock_pair_delivers_in_order() {
    let (mut a, mut b) = MockChannel::pair();
    a.send(&MessageTag::OutputMessage, "one").unwrap();
    a.send(&MessageTag::OutputMessage, "two").unwrap();

    assert_eq!(b.receive().unwrap().text(), "one");
    assert_eq!(b.receive().unwrap().text(), "two");
}

#[test]
fn mock_empty_queue_reads_as_closed() {
    let mut chan = MockChannel::new();
    assert!(matches!(chan.receive(), Err(ProtocolError::ConnectionClosed)));
}

#[test]
fn mock_queue_and_take() {
    let mut chan = MockChannel::new();
    chan.queue_incoming(Frame::empty(&MessageTag::ScriptEnd));
    assert_eq!(chan.pending_incoming(), 1);
    assert_eq!(chan.receive().unwrap().tag, "c_script_end");

    chan.send_frame(&Frame::empty(&MessageTag::ScriptRun)).unwrap();
    assert_eq!(chan.take_outgoing().unwrap().tag, "s_script_run");
    assert!(chan.take_outgoing().is_none());
}

#[test]
fn mock_close_fails_both_directions() {
    let (mut a, mut b) = MockChannel::pair();
    a.close();
    assert!(!b.is_connected());
    assert!(a.send_frame(&Frame::empty(&MessageTag::ScriptEnd)).is_err());
    assert!(b.receive().unwrap_err().is_connection_error());
}

#[test]
fn boxed_channel_forwards() {
    let probe = MockChannel::new();
    let mut boxed: Box<dyn FrameChannel> = Box::new(probe.clone());
    boxed.send(&MessageTag::OutputMessage, "via box").unwrap();
    assert_eq!(probe.take_outgoing().unwrap().text(), "via box");
}

// ── TcpTransport ────────────────────────────────────────────────

#[test]
fn tcp_transport_exchanges_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut transport = TcpTransport::accepted(stream).unwrap();
        let frame = transport.receive().unwrap();
        transport
            .send(&MessageTag::OutputMessage, &format!("echo: {}", frame.text()))
            .unwrap();
        transport.frames_received()
    });

    let mut client = TcpTransport::connect(addr).unwrap();
    client.send(&MessageTag::OutputMessage, "ping").unwrap();
    assert_eq!(client.receive().unwrap().text(), "echo: ping");
    assert_eq!(client.frames_sent(), 1);
    assert_eq!(server.join().unwrap(), 1);
}

#[test]
fn tcp_transport_reports_peer_close() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        drop(stream);
    });

    let mut client = TcpTransport::connect(addr).unwrap();
    server.join().unwrap();
    assert!(client.receive().unwrap_err().is_connection_error());
}

#[test]
fn tcp_connect_refused_is_connection_error() {
    // Bind then drop to find a port nobody listens on.
    let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let err = TcpTransport::connect(addr).unwrap_err();
    assert!(err.is_connection_error());
}
