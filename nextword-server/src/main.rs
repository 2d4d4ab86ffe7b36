mod session;

use std::path::Path;
use std::sync::RwLock;

use actix_cors::Cors;
use actix_multipart::Multipart;
use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, post, web};
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};

use nextword_core::artifact::ArtifactStore;
use nextword_core::matcher::{DEFAULT_MATCH_LIMIT, match_lines};
use nextword_core::registry::DatasetRegistry;

const DATA_DIR: &str = "./data";
const MODELS_DIR: &str = "./models";
const PREVIEW_DEFAULT_LINES: usize = 500;
const PREVIEW_MAX_LINES: usize = 5000;

/// Shared server state behind a single-writer/multi-reader lock.
///
/// The registry is replaced wholesale after each upload, so readers always
/// see a complete snapshot.
pub(crate) struct SharedData {
	pub(crate) registry: DatasetRegistry,
}

#[derive(Serialize)]
struct ApiMessage {
	message: String,
}

#[derive(Serialize)]
struct UploadResponse {
	message: String,
	new_dataset_key: String,
}

#[derive(Deserialize, Serialize)]
struct PredictRequest {
	dataset: String,
	text: String,
}

#[derive(Serialize, Deserialize)]
struct PredictResponse {
	predictions: Vec<String>,
}

#[derive(Deserialize)]
struct StatusQuery {
	dataset: String,
}

#[derive(Serialize, Deserialize)]
struct StatusResponse {
	is_trained: bool,
}

#[derive(Deserialize)]
struct PreviewQuery {
	dataset: String,
	max_lines: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct PreviewResponse {
	preview: String,
}

/// Strips path components and anything outside `[A-Za-z0-9._-]`.
fn sanitize_filename(name: &str) -> String {
	let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
	base.chars()
		.filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
		.collect()
}

/// HTTP GET endpoint `/get_datasets`
///
/// Lists the keys of all datasets currently on disk.
#[get("/get_datasets")]
async fn get_datasets(data: web::Data<RwLock<SharedData>>) -> impl Responder {
	let shared_data = match data.read() {
		Ok(guard) => guard,
		Err(_) => return HttpResponse::InternalServerError().body("Registry lock failed"),
	};
	HttpResponse::Ok().json(shared_data.registry.keys())
}

/// HTTP POST endpoint `/upload_dataset`
///
/// Accepts a multipart plain-text file, writes it under the data directory
/// and swaps in a freshly scanned registry snapshot.
///
/// # Errors
/// - 400 for non-text content types or a missing/empty filename
/// - 500 when the file cannot be saved
#[post("/upload_dataset")]
async fn upload_dataset(
	data: web::Data<RwLock<SharedData>>,
	mut payload: Multipart,
) -> impl Responder {
	let mut saved: Option<String> = None;

	loop {
		let mut field = match payload.try_next().await {
			Ok(Some(field)) => field,
			Ok(None) => break,
			Err(error) => {
				return HttpResponse::InternalServerError()
					.json(ApiMessage { message: format!("Could not read upload: {error}") });
			}
		};

		let is_text = field
			.content_type()
			.map(|mime| mime.essence_str() == "text/plain")
			.unwrap_or(false);
		if !is_text {
			return HttpResponse::BadRequest().json(ApiMessage {
				message: "Invalid file type. Please upload a .txt file.".to_owned(),
			});
		}

		let filename = field
			.content_disposition()
			.and_then(|cd| cd.get_filename())
			.map(sanitize_filename)
			.unwrap_or_default();
		if filename.is_empty() {
			return HttpResponse::BadRequest()
				.json(ApiMessage { message: "Missing filename".to_owned() });
		}

		let mut bytes: Vec<u8> = Vec::new();
		loop {
			match field.try_next().await {
				Ok(Some(chunk)) => bytes.extend_from_slice(&chunk),
				Ok(None) => break,
				Err(error) => {
					return HttpResponse::InternalServerError()
						.json(ApiMessage { message: format!("Could not read upload: {error}") });
				}
			}
		}

		if let Err(error) = std::fs::write(Path::new(DATA_DIR).join(&filename), &bytes) {
			return HttpResponse::InternalServerError()
				.json(ApiMessage { message: format!("Could not save file: {error}") });
		}
		saved = Some(filename);
	}

	let filename = match saved {
		Some(filename) => filename,
		None => {
			return HttpResponse::BadRequest()
				.json(ApiMessage { message: "No file provided".to_owned() });
		}
	};

	let registry = match DatasetRegistry::scan(DATA_DIR) {
		Ok(registry) => registry,
		Err(error) => {
			return HttpResponse::InternalServerError()
				.json(ApiMessage { message: format!("Could not rescan datasets: {error}") });
		}
	};
	match data.write() {
		Ok(mut guard) => guard.registry = registry,
		Err(_) => return HttpResponse::InternalServerError().body("Registry lock failed"),
	}

	let key = Path::new(&filename)
		.file_stem()
		.map(|stem| stem.to_string_lossy().to_string())
		.unwrap_or_else(|| filename.clone());

	HttpResponse::Ok().json(UploadResponse {
		message: format!("File '{filename}' uploaded successfully."),
		new_dataset_key: key,
	})
}

/// HTTP POST endpoint `/predict`
///
/// Live typeahead over literal dataset lines: prefix matches ranked before
/// substring matches. Degrades to an empty list for empty input or an
/// unknown/unreadable dataset.
#[post("/predict")]
async fn predict(
	data: web::Data<RwLock<SharedData>>,
	request: web::Json<PredictRequest>,
) -> impl Responder {
	let text = request.text.trim().to_lowercase();
	if text.is_empty() {
		return HttpResponse::Ok().json(PredictResponse { predictions: Vec::new() });
	}

	let lines = match data.read() {
		Ok(guard) => guard.registry.read_lines(&request.dataset).unwrap_or_default(),
		Err(_) => return HttpResponse::InternalServerError().body("Registry lock failed"),
	};

	let predictions = match_lines(&lines, &text, DEFAULT_MATCH_LIMIT);
	HttpResponse::Ok().json(PredictResponse { predictions })
}

/// HTTP GET endpoint `/check_model_status`
///
/// A dataset counts as trained only when both artifact files exist.
#[get("/check_model_status")]
async fn check_model_status(
	store: web::Data<ArtifactStore>,
	query: web::Query<StatusQuery>,
) -> impl Responder {
	HttpResponse::Ok().json(StatusResponse { is_trained: store.is_trained(&query.dataset) })
}

/// HTTP GET endpoint `/get_dataset_preview`
///
/// Returns the first `max_lines` lines of a dataset (default 500, capped at
/// 5000 server-side). Unknown datasets yield an empty preview; read errors
/// are embedded in the response body.
#[get("/get_dataset_preview")]
async fn get_dataset_preview(
	data: web::Data<RwLock<SharedData>>,
	query: web::Query<PreviewQuery>,
) -> impl Responder {
	let max_lines = query.max_lines.unwrap_or(PREVIEW_DEFAULT_LINES).clamp(1, PREVIEW_MAX_LINES);

	let shared_data = match data.read() {
		Ok(guard) => guard,
		Err(_) => return HttpResponse::InternalServerError().body("Registry lock failed"),
	};

	if !shared_data.registry.contains(&query.dataset) {
		return HttpResponse::Ok().json(PreviewResponse { preview: String::new() });
	}

	let preview = match shared_data.registry.read_lines(&query.dataset) {
		Ok(lines) => lines.into_iter().take(max_lines).collect::<Vec<_>>().join("\n"),
		Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
			format!("Error: {}.txt not found.", query.dataset)
		}
		Err(error) => format!("An error occurred: {error}"),
	};

	HttpResponse::Ok().json(PreviewResponse { preview })
}

/// Main entry point for the server.
///
/// Scans the data directory, opens the artifact store, and serves the JSON
/// API plus the `/ws` training channel on 127.0.0.1:5000.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

	std::fs::create_dir_all(DATA_DIR)?;
	let registry = DatasetRegistry::scan(DATA_DIR)?;
	let shared_data = web::Data::new(RwLock::new(SharedData { registry }));
	let store = web::Data::new(ArtifactStore::new(MODELS_DIR)?);
	let locks = web::Data::new(session::TrainLocks::default());

	log::info!("listening on 127.0.0.1:5000");
	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared_data.clone())
			.app_data(store.clone())
			.app_data(locks.clone())
			.service(get_datasets)
			.service(upload_dataset)
			.service(predict)
			.service(check_model_status)
			.service(get_dataset_preview)
			.service(session::train_ws)
	})
	.bind(("127.0.0.1", 5000))?
	.run()
	.await
}

#[cfg(test)]
mod tests {
	use std::fs;
	use std::path::PathBuf;

	use actix_web::test;

	use super::*;

	fn temp_dir(tag: &str) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("nextword-server-{tag}-{}", std::process::id()));
		let _ = fs::remove_dir_all(&dir);
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	fn shared_state(dir: &Path) -> web::Data<RwLock<SharedData>> {
		let registry = DatasetRegistry::scan(dir).unwrap();
		web::Data::new(RwLock::new(SharedData { registry }))
	}

	#[actix_web::test]
	async fn get_datasets_lists_keys() {
		let dir = temp_dir("datasets");
		fs::write(dir.join("cities.txt"), "paris\n").unwrap();
		fs::write(dir.join("fruits.txt"), "apple\n").unwrap();

		let app =
			test::init_service(App::new().app_data(shared_state(&dir)).service(get_datasets)).await;
		let request = test::TestRequest::get().uri("/get_datasets").to_request();
		let keys: Vec<String> = test::call_and_read_body_json(&app, request).await;
		assert_eq!(keys, vec!["cities".to_string(), "fruits".to_string()]);

		fs::remove_dir_all(&dir).unwrap();
	}

	#[actix_web::test]
	async fn predict_ranks_prefix_before_substring() {
		let dir = temp_dir("predict");
		fs::write(dir.join("fruits.txt"), "apple pie\npineapple\ncherry\n").unwrap();

		let app = test::init_service(App::new().app_data(shared_state(&dir)).service(predict)).await;
		let request = test::TestRequest::post()
			.uri("/predict")
			.set_json(PredictRequest { dataset: "fruits".to_owned(), text: "Apple".to_owned() })
			.to_request();
		let response: PredictResponse = test::call_and_read_body_json(&app, request).await;
		assert_eq!(response.predictions, vec!["apple pie".to_string(), "pineapple".to_string()]);

		fs::remove_dir_all(&dir).unwrap();
	}

	#[actix_web::test]
	async fn predict_degrades_to_empty_for_unknown_dataset_or_empty_text() {
		let dir = temp_dir("predict-empty");
		fs::write(dir.join("fruits.txt"), "apple\n").unwrap();

		let app = test::init_service(App::new().app_data(shared_state(&dir)).service(predict)).await;

		let request = test::TestRequest::post()
			.uri("/predict")
			.set_json(PredictRequest { dataset: "ghost".to_owned(), text: "apple".to_owned() })
			.to_request();
		let response: PredictResponse = test::call_and_read_body_json(&app, request).await;
		assert!(response.predictions.is_empty());

		let request = test::TestRequest::post()
			.uri("/predict")
			.set_json(PredictRequest { dataset: "fruits".to_owned(), text: "   ".to_owned() })
			.to_request();
		let response: PredictResponse = test::call_and_read_body_json(&app, request).await;
		assert!(response.predictions.is_empty());

		fs::remove_dir_all(&dir).unwrap();
	}

	#[actix_web::test]
	async fn status_reflects_artifact_files() {
		let models = temp_dir("status-models");
		let store = web::Data::new(ArtifactStore::new(&models).unwrap());

		let app = test::init_service(
			App::new().app_data(store.clone()).service(check_model_status),
		)
		.await;

		let request =
			test::TestRequest::get().uri("/check_model_status?dataset=cities").to_request();
		let response: StatusResponse = test::call_and_read_body_json(&app, request).await;
		assert!(!response.is_trained);

		// Both artifact files present flips the status
		fs::write(models.join("cities.model"), b"m").unwrap();
		fs::write(models.join("cities.vocab"), b"v").unwrap();
		let request =
			test::TestRequest::get().uri("/check_model_status?dataset=cities").to_request();
		let response: StatusResponse = test::call_and_read_body_json(&app, request).await;
		assert!(response.is_trained);

		fs::remove_dir_all(&models).unwrap();
	}

	#[actix_web::test]
	async fn preview_caps_line_count_and_handles_unknown_keys() {
		let dir = temp_dir("preview");
		let body: String = (0..10).map(|i| format!("line {i}\n")).collect();
		fs::write(dir.join("cities.txt"), body).unwrap();

		let app = test::init_service(
			App::new().app_data(shared_state(&dir)).service(get_dataset_preview),
		)
		.await;

		let request = test::TestRequest::get()
			.uri("/get_dataset_preview?dataset=cities&max_lines=3")
			.to_request();
		let response: PreviewResponse = test::call_and_read_body_json(&app, request).await;
		assert_eq!(response.preview, "line 0\nline 1\nline 2");

		let request =
			test::TestRequest::get().uri("/get_dataset_preview?dataset=ghost").to_request();
		let response: PreviewResponse = test::call_and_read_body_json(&app, request).await;
		assert_eq!(response.preview, "");

		fs::remove_dir_all(&dir).unwrap();
	}

	// `use actix_web::test` shadows the built-in `#[test]` attribute here.
	#[std::prelude::v1::test]
	fn sanitize_filename_strips_paths_and_odd_characters() {
		assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
		assert_eq!(sanitize_filename("my data (1).txt"), "mydata1.txt");
		assert_eq!(sanitize_filename("C:\\files\\cities.txt"), "cities.txt");
		assert_eq!(sanitize_filename("plain.txt"), "plain.txt");
	}
}
