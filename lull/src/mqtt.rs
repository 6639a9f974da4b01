//! MQTT plumbing for the voice assistant.
//!
//! Intents arrive on `hermes/intent/#`; spoken notifications go out by
//! starting a dialogue-manager session. The broker connection runs on a
//! background thread that feeds parsed commands into a queue the main
//! loop drains each tick.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use lull_common::{Command, command::parse_from_intent};
use rumqttc::{Client, ClientError, Connection, Event, MqttOptions, Packet, QoS};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

const BROKER_HOST: &str = "localhost";
const BROKER_PORT: u16 = 12183;
const CLIENT_ID: &str = "lull";

const INTENT_TOPIC: &str = "hermes/intent/#";
const NOTIFICATION_TOPIC: &str = "hermes/dialogueManager/startSession";

/// Functionality to communicate with an MQTT broker.
pub struct MqttClient {
    client: Client,
    pending_commands: Arc<Mutex<VecDeque<Command>>>,
    pending_notifications: VecDeque<String>,
    is_connected: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
}

impl MqttClient {
    /// Connect to the broker and start the background event thread.
    ///
    /// The subscription is queued immediately; the connection itself is
    /// retried on the background thread until it succeeds or the client
    /// is stopped.
    pub fn connect() -> Result<Self, ClientError> {
        let mut options = MqttOptions::new(CLIENT_ID, BROKER_HOST, BROKER_PORT);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, connection) = Client::new(options, 32);
        client.subscribe(INTENT_TOPIC, QoS::AtMostOnce)?;

        let pending_commands = Arc::new(Mutex::new(VecDeque::new()));
        let is_connected = Arc::new(AtomicBool::new(false));
        let stop_requested = Arc::new(AtomicBool::new(false));

        {
            let pending_commands = Arc::clone(&pending_commands);
            let is_connected = Arc::clone(&is_connected);
            let stop_requested = Arc::clone(&stop_requested);

            thread::spawn(move || {
                poll_connection(connection, pending_commands, is_connected, stop_requested);
            });
        }

        info!("Connecting to MQTT host {BROKER_HOST}:{BROKER_PORT}...");

        Ok(Self {
            client,
            pending_commands,
            pending_notifications: VecDeque::new(),
            is_connected,
            stop_requested,
        })
    }

    /// Stop MQTT services.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);

        if let Err(err) = self.client.disconnect() {
            debug!("MQTT disconnect failed: {err}.");
        }
    }

    /// Pop the next pending command off the queue, if there is one.
    pub fn pop_command(&self) -> Option<Command> {
        let mut pending = self
            .pending_commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.pop_front()
    }

    /// Queue a notification to be spoken via the dialogue manager.
    pub fn play_notification(&mut self, notification: String) {
        self.pending_notifications.push_back(notification);
    }

    /// Publish the pending notifications, once connected.
    pub fn process(&mut self) {
        if !self.is_connected.load(Ordering::SeqCst) {
            return;
        }

        while let Some(notification) = self.pending_notifications.pop_front() {
            let payload = notification_payload(&notification);

            if let Err(err) = self
                .client
                .publish(NOTIFICATION_TOPIC, QoS::AtLeastOnce, false, payload)
            {
                warn!("Failed to publish notification: {err}.");
            }
        }
    }
}

fn poll_connection(
    mut connection: Connection,
    pending_commands: Arc<Mutex<VecDeque<Command>>>,
    is_connected: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
) {
    for event in connection.iter() {
        if stop_requested.load(Ordering::SeqCst) {
            break;
        }

        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Finished connecting to MQTT host.");
                is_connected.store(true, Ordering::SeqCst);
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let payload = String::from_utf8_lossy(&publish.payload);
                debug!(
                    "Received a message on topic '{}': {payload}",
                    publish.topic
                );

                let payload_json: Value = match serde_json::from_str(&payload) {
                    Ok(value) => value,
                    Err(err) => {
                        warn!("JSON error decoding intent message: {err}.");
                        continue;
                    }
                };

                if let Some(command) = parse_from_intent(&payload_json) {
                    let mut pending = pending_commands
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    pending.push_back(command);
                }
            }
            Ok(_) => {}
            Err(err) => {
                is_connected.store(false, Ordering::SeqCst);
                warn!("MQTT connection error: {err}.");

                // Back off before the automatic reconnect attempt.
                thread::sleep(Duration::from_secs(2));
            }
        }
    }
}

fn notification_payload(text: &str) -> String {
    json!({
        "init": {"type": "notification", "text": text},
        "siteId": "default",
    })
    .to_string()
}
