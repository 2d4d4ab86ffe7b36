//! WebSocket training sessions.
//!
//! One inbound `{action: "train", dataset, custom_text?}` command starts a
//! training run on a blocking worker; progress events are forwarded back to
//! the client as JSON status messages. The worker outlives the connection:
//! a disconnect never cancels training.

use std::collections::HashSet;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use actix_web::{HttpRequest, HttpResponse, get, web};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use nextword_core::artifact::ArtifactStore;
use nextword_core::trainer::{TrainEvent, Trainer};

use crate::SharedData;

/// Dataset keys with a training run currently in flight.
///
/// One run per key at a time; a second train command for the same key is
/// rejected instead of racing on the artifact path.
#[derive(Default)]
pub(crate) struct TrainLocks {
	in_progress: Mutex<HashSet<String>>,
}

impl TrainLocks {
	fn acquire(&self, key: &str) -> bool {
		match self.in_progress.lock() {
			Ok(mut guard) => guard.insert(key.to_owned()),
			Err(_) => false,
		}
	}

	fn release(&self, key: &str) {
		if let Ok(mut guard) = self.in_progress.lock() {
			guard.remove(key);
		}
	}
}

/// Inbound control message.
#[derive(Deserialize)]
struct TrainCommand {
	action: String,
	dataset: String,
	custom_text: Option<String>,
}

/// Outbound status message, one per progress event.
#[derive(Serialize)]
struct StatusMessage<'a> {
	status: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	dataset: Option<&'a str>,
	log: String,
}

fn wire_message(event: &TrainEvent) -> StatusMessage<'_> {
	match event {
		TrainEvent::Started => StatusMessage {
			status: "training",
			dataset: None,
			log: "Starting training...".to_owned(),
		},
		TrainEvent::Epoch { epoch, total, loss } => StatusMessage {
			status: "training",
			dataset: None,
			log: format!("Epoch {epoch}/{total} - loss: {loss:.4}"),
		},
		TrainEvent::Completed { dataset } => StatusMessage {
			status: "trained",
			dataset: Some(dataset),
			log: "Model training complete.".to_owned(),
		},
		TrainEvent::Failed { reason } => StatusMessage {
			status: "failed",
			dataset: None,
			log: reason.clone(),
		},
	}
}

async fn send(session: &mut actix_ws::Session, message: &StatusMessage<'_>) {
	if let Ok(text) = serde_json::to_string(message) {
		// Send failures mean the client went away; training carries on
		let _ = session.text(text).await;
	}
}

async fn send_failure(session: &mut actix_ws::Session, reason: String) {
	send(session, &wire_message(&TrainEvent::Failed { reason })).await;
}

/// HTTP GET endpoint `/ws`
///
/// Upgrades to a WebSocket and runs the training control loop on it.
#[get("/ws")]
pub(crate) async fn train_ws(
	req: HttpRequest,
	body: web::Payload,
	data: web::Data<RwLock<SharedData>>,
	store: web::Data<ArtifactStore>,
	locks: web::Data<TrainLocks>,
) -> actix_web::Result<HttpResponse> {
	let (response, session, stream) = actix_ws::handle(&req, body)?;
	actix_web::rt::spawn(run_session(session, stream, data, store, locks));
	Ok(response)
}

async fn run_session(
	mut session: actix_ws::Session,
	mut stream: actix_ws::MessageStream,
	data: web::Data<RwLock<SharedData>>,
	store: web::Data<ArtifactStore>,
	locks: web::Data<TrainLocks>,
) {
	while let Some(Ok(message)) = stream.next().await {
		match message {
			actix_ws::Message::Ping(bytes) => {
				let _ = session.pong(&bytes).await;
			}
			actix_ws::Message::Text(text) => {
				let command: TrainCommand = match serde_json::from_str(&text) {
					Ok(command) => command,
					Err(error) => {
						send_failure(&mut session, format!("Invalid command: {error}")).await;
						continue;
					}
				};
				if command.action != "train" {
					send_failure(&mut session, format!("Unknown action: {}", command.action)).await;
					continue;
				}
				handle_train(&mut session, command, &data, &store, &locks).await;
			}
			actix_ws::Message::Close(_) => break,
			_ => {}
		}
	}
}

async fn handle_train(
	session: &mut actix_ws::Session,
	command: TrainCommand,
	data: &web::Data<RwLock<SharedData>>,
	store: &web::Data<ArtifactStore>,
	locks: &web::Data<TrainLocks>,
) {
	let dataset = command.dataset;

	let text = if dataset == "custom" {
		match command.custom_text {
			Some(text) => text,
			None => {
				send_failure(session, "Missing custom_text for custom dataset".to_owned()).await;
				return;
			}
		}
	} else {
		let registry = match data.read() {
			Ok(guard) => guard.registry.clone(),
			Err(_) => {
				send_failure(session, "Registry lock failed".to_owned()).await;
				return;
			}
		};
		match registry.read(&dataset) {
			Ok(text) => text,
			Err(error) => {
				send_failure(session, format!("Could not read dataset '{dataset}': {error}")).await;
				return;
			}
		}
	};

	if !locks.acquire(&dataset) {
		send_failure(session, format!("Training already in progress for dataset '{dataset}'"))
			.await;
		return;
	}

	let (tx, mut rx) = mpsc::unbounded_channel::<TrainEvent>();
	let trainer = Trainer::new(store.get_ref().clone());
	let worker_dataset = dataset.clone();
	let worker = actix_web::rt::task::spawn_blocking(move || {
		let mut sink = move |event: TrainEvent| {
			// Receiver may be gone already; ignore and keep training
			let _ = tx.send(event);
		};
		// Failures already reach the client as a Failed event
		let _ = trainer.train(&worker_dataset, &text, &mut sink);
	});

	while let Some(event) = rx.recv().await {
		send(session, &wire_message(&event)).await;
		// Brief pause so the transport can flush between epoch messages
		actix_web::rt::time::sleep(Duration::from_millis(10)).await;
	}

	let _ = worker.await;
	locks.release(&dataset);
}
