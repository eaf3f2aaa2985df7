//! Integration tests for the spectator client against a scripted netorcai server
//!
//! These tests run the real TCP connection, the network thread and the
//! reconciler together. The server side is a plain std listener thread that
//! speaks the metaprotocol frame by frame.

use client::connection::{GameServerConnection, TcpConnection};
use client::ingestor::{IngestorConfig, Outcome};
use client::model::{connection_lost_annotation, GameStateModel};
use client::reconciler::{SessionPhase, Step};
use client::renderer::Renderer;
use client::session::Session;
use protocol::framing::encode_frame;
use protocol::{Explosions, PlayerInfo};
use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

fn send(stream: &mut TcpStream, value: Value) {
    let bytes = encode_frame(&serde_json::to_vec(&value).unwrap()).unwrap();
    stream.write_all(&bytes).unwrap();
}

fn receive(stream: &mut TcpStream) -> Value {
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).unwrap();
    let mut content = vec![0u8; u32::from_le_bytes(header) as usize];
    stream.read_exact(&mut content).unwrap();
    serde_json::from_slice(&content).unwrap()
}

/// Binds an ephemeral port and runs `script` against the first client.
fn fake_server<F, T>(script: F) -> (u16, JoinHandle<T>)
where
    F: FnOnce(TcpStream) -> T + Send + 'static,
    T: Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        script(stream)
    });

    (port, handle)
}

fn accept_login(stream: &mut TcpStream) -> Value {
    let login = receive(stream);
    send(stream, json!({"message_type": "LOGIN_ACK", "metaprotocol_version": "2.0.0"}));
    login
}

fn players(second_connected: bool) -> Value {
    json!([
        {"player_id": 0, "nickname": "alice", "remote_address": "10.0.0.1:1234", "is_connected": true},
        {"player_id": 1, "nickname": "bob", "remote_address": "10.0.0.2:1234", "is_connected": second_connected}
    ])
}

fn game_starts(nb_turns_max: u32) -> Value {
    json!({
        "message_type": "GAME_STARTS",
        "player_id": -1,
        "players_info": players(true),
        "nb_players": 2,
        "nb_special_players": 0,
        "nb_turns_max": nb_turns_max,
        "milliseconds_before_first_turn": 1000.0,
        "milliseconds_between_turns": 50.0,
        "initial_game_state": {
            "cells": [
                {"q": 0, "r": 0, "color": 0},
                {"q": 1, "r": 0, "color": 0},
                {"q": 0, "r": 1, "color": 0}
            ],
            "characters": [
                {"id": 0, "color": 1, "q": 0, "r": 0, "alive": true, "revive_delay": -1},
                {"id": 1, "color": 2, "q": 1, "r": 0, "alive": true, "revive_delay": -1}
            ],
            "bombs": [],
            "score": {"1": 0, "2": 0},
            "cell_count": {"1": 0, "2": 0}
        }
    })
}

fn turn(turn_number: u32, second_connected: bool) -> Value {
    json!({
        "message_type": "TURN",
        "turn_number": turn_number,
        "players_info": players(second_connected),
        "game_state": {
            "cells": [{"q": 0, "r": 0, "color": 1}],
            "characters": [
                {"id": 0, "color": 1, "q": 0, "r": 0, "alive": true, "revive_delay": -1},
                {"id": 1, "color": 2, "q": 1, "r": 0, "alive": false, "revive_delay": 3}
            ],
            "bombs": [{"q": 0, "r": 1, "color": 1, "range": 2, "delay": 2}],
            "score": {"1": 5, "2": 0},
            "cell_count": {"1": 1, "2": 0}
        }
    })
}

/// Headless renderer that records what the reconciler hands it.
#[derive(Default)]
struct HeadlessRenderer {
    inits: u32,
    turns: Vec<u32>,
    ended: bool,
    errors: Vec<(String, bool)>,
    last_roster: Vec<PlayerInfo>,
    last_alive: Vec<(i32, bool)>,
    neutral_cells: usize,
}

impl Renderer for HeadlessRenderer {
    fn on_init(&mut self, model: &GameStateModel, _max_turns: u32, players_info: &[PlayerInfo]) {
        self.inits += 1;
        self.last_roster = players_info.to_vec();
        self.neutral_cells = model.neutral_cell_count();
    }

    fn on_turn(
        &mut self,
        model: &GameStateModel,
        turn_number: u32,
        _max_turns: u32,
        _explosions: Option<&Explosions>,
        players_info: &[PlayerInfo],
    ) {
        self.turns.push(turn_number);
        self.last_roster = players_info.to_vec();
        self.last_alive = model.characters().map(|c| (c.id, c.is_alive)).collect();
        self.neutral_cells = model.neutral_cell_count();
    }

    fn on_end(&mut self, _model: &GameStateModel) {
        self.ended = true;
    }

    fn on_error(&mut self, message: &str, fatal: bool) {
        self.errors.push((message.to_string(), fatal));
    }

    fn request_shutdown(&mut self) -> bool {
        false
    }
}

fn config(port: u16) -> IngestorConfig {
    IngestorConfig {
        host: "127.0.0.1".to_string(),
        port,
        nickname: "integration-visu".to_string(),
        receive_timeout: Duration::from_millis(10),
        game_start_timeout: Duration::from_secs(5),
    }
}

/// Ticks the session like a render loop until `done` says so.
fn render_until(
    session: &mut Session,
    renderer: &mut HeadlessRenderer,
    mut done: impl FnMut(Step) -> bool,
) -> Step {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let step = session.tick(renderer);
        if done(step) {
            return step;
        }
        assert!(Instant::now() < deadline, "render loop timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

/// FULL SESSION TESTS
mod session_tests {
    use super::*;

    #[test]
    fn full_game_is_followed_and_every_turn_acknowledged() {
        let (port, server) = fake_server(|mut stream| {
            let login = accept_login(&mut stream);
            send(&mut stream, game_starts(5));

            let mut acks = Vec::new();
            for n in 0..5 {
                send(&mut stream, turn(n, true));
                let ack = receive(&mut stream);
                assert_eq!(ack["message_type"], "TURN_ACK");
                assert_eq!(ack["actions"], json!([]));
                acks.push(ack["turn_number"].as_u64().unwrap());
            }

            send(
                &mut stream,
                json!({"message_type": "GAME_ENDS", "winner_player_id": 0, "game_state": {}}),
            );
            (login, acks)
        });

        let mut session = Session::spawn(TcpConnection::new().unwrap(), config(port)).unwrap();
        let mut renderer = HeadlessRenderer::default();

        render_until(&mut session, &mut renderer, |step| step == Step::GameOver);

        let (login, acks) = server.join().unwrap();
        assert_eq!(login["message_type"], "LOGIN");
        assert_eq!(login["nickname"], "integration-visu");
        assert_eq!(login["role"], "visualization");
        assert_eq!(login["metaprotocol_version"], "2.0.0");
        assert_eq!(acks, vec![0, 1, 2, 3, 4]);

        assert_eq!(renderer.inits, 1);
        assert!(renderer.ended);
        assert!(renderer.errors.is_empty());
        assert!(renderer.turns.len() <= 5);
        assert!(renderer.turns.windows(2).all(|w| w[0] < w[1]));

        let report = session.shutdown();
        assert_eq!(report.outcome, Some(Outcome::GameEnded));
        assert_eq!(report.phase, SessionPhase::Over);
        assert_eq!(report.stats.acks_sent, 5);
        assert_eq!(
            report.stats.turns_forwarded + report.stats.turns_dropped,
            5
        );
        assert_eq!(report.released, 0);
    }

    #[test]
    fn disconnection_and_death_are_visible_to_the_renderer() {
        let (port, server) = fake_server(|mut stream| {
            accept_login(&mut stream);
            send(&mut stream, game_starts(1000));

            // Turns keep coming until the client leaves, so one of them is
            // bound to reach the renderer.
            for n in 0..1000 {
                let frame = encode_frame(&serde_json::to_vec(&turn(n, false)).unwrap()).unwrap();
                let mut header = [0u8; 4];
                if stream.write_all(&frame).is_err() || stream.read_exact(&mut header).is_err() {
                    break;
                }
                let mut ack = vec![0u8; u32::from_le_bytes(header) as usize];
                if stream.read_exact(&mut ack).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(5));
            }
        });

        let mut session = Session::spawn(TcpConnection::new().unwrap(), config(port)).unwrap();
        let mut renderer = HeadlessRenderer::default();

        render_until(&mut session, &mut renderer, |step| {
            matches!(step, Step::TurnApplied(_))
        });

        let first_turn = renderer.turns[0];
        let bob = &renderer.last_roster[1];
        assert!(!bob.is_connected);
        assert_eq!(bob.remote_address, connection_lost_annotation(first_turn));
        assert!(renderer.last_roster[0].is_connected);
        assert_eq!(renderer.last_alive, vec![(0, true), (1, false)]);
        assert_eq!(renderer.neutral_cells, 2);

        let started = Instant::now();
        let report = session.shutdown();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(report.outcome, Some(Outcome::Cancelled));
        server.join().unwrap();
    }

    #[test]
    fn kick_at_login_is_a_fatal_error() {
        let (port, server) = fake_server(|mut stream| {
            receive(&mut stream);
            send(
                &mut stream,
                json!({"message_type": "KICK", "kick_reason": "Maximum number of visualizations reached"}),
            );
        });

        let mut session = Session::spawn(TcpConnection::new().unwrap(), config(port)).unwrap();
        let mut renderer = HeadlessRenderer::default();

        let step = render_until(&mut session, &mut renderer, |step| step != Step::Idle);
        server.join().unwrap();

        assert_eq!(step, Step::Close);
        assert_eq!(renderer.errors.len(), 1);
        let (message, fatal) = &renderer.errors[0];
        assert!(message.contains("Maximum number of visualizations reached"));
        assert!(*fatal);

        let report = session.shutdown();
        assert!(matches!(report.outcome, Some(Outcome::Failed(_))));
        assert_eq!(report.phase, SessionPhase::Failed);
    }

    #[test]
    fn server_hangup_after_start_is_shown_but_not_fatal() {
        let (port, server) = fake_server(|mut stream| {
            accept_login(&mut stream);
            send(&mut stream, game_starts(10));
        });

        let mut session = Session::spawn(TcpConnection::new().unwrap(), config(port)).unwrap();
        let mut renderer = HeadlessRenderer::default();

        render_until(&mut session, &mut renderer, |step| step == Step::ErrorShown);
        server.join().unwrap();

        assert_eq!(renderer.inits, 1);
        assert_eq!(renderer.errors.len(), 1);
        assert!(!renderer.errors[0].1);
        assert_eq!(session.reconciler().phase(), SessionPhase::Running);
    }

    #[test]
    fn refused_connection_is_reported() {
        // Bind then drop to get a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let mut session = Session::spawn(TcpConnection::new().unwrap(), config(port)).unwrap();
        let mut renderer = HeadlessRenderer::default();

        let step = render_until(&mut session, &mut renderer, |step| step != Step::Idle);

        assert_eq!(step, Step::Close);
        assert!(renderer.errors[0].0.starts_with("connection error"));
    }
}

/// CONNECTION TESTS
mod connection_tests {
    use super::*;

    #[test]
    fn frames_split_across_writes_are_reassembled() {
        let (port, server) = fake_server(|mut stream| {
            accept_login(&mut stream);
            let bytes = encode_frame(&serde_json::to_vec(&turn(7, true)).unwrap()).unwrap();
            let (head, tail) = bytes.split_at(bytes.len() / 2);
            stream.write_all(head).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(50));
            stream.write_all(tail).unwrap();
            receive(&mut stream)
        });

        let mut connection = TcpConnection::new().unwrap();
        connection.connect("127.0.0.1", port).unwrap();
        connection.login("split", "visualization").unwrap();

        let mut frame = None;
        let deadline = Instant::now() + Duration::from_secs(5);
        while frame.is_none() {
            assert!(Instant::now() < deadline);
            frame = connection.receive_frame(Duration::from_millis(10)).unwrap();
        }

        match protocol::decode(&frame.unwrap()).unwrap() {
            protocol::ServerMessage::Turn(turn) => assert_eq!(turn.turn_number, 7),
            other => panic!("Unexpected message: {:?}", other),
        }

        connection.send_turn_ack(7, json!([])).unwrap();
        let ack = server.join().unwrap();
        assert_eq!(ack, json!({"message_type": "TURN_ACK", "turn_number": 7, "actions": []}));
        connection.close();
        assert!(!connection.is_connected());
    }

    #[test]
    fn receive_times_out_without_data() {
        let (port, server) = fake_server(|mut stream| {
            accept_login(&mut stream);
            let mut rest = Vec::new();
            let _ = stream.read_to_end(&mut rest);
        });

        let mut connection = TcpConnection::new().unwrap();
        connection.connect("127.0.0.1", port).unwrap();
        connection.login("idle", "visualization").unwrap();

        let started = Instant::now();
        assert!(connection
            .receive_frame(Duration::from_millis(30))
            .unwrap()
            .is_none());
        assert!(started.elapsed() >= Duration::from_millis(25));

        connection.close();
        server.join().unwrap();
    }
}
