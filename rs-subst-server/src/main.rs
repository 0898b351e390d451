use std::collections::BTreeMap;
use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{get, put, web, App, HttpResponse, HttpServer, Responder};
use log::{error, info};
use serde::Deserialize;

use rs_subst_core::analysis::chi_square::format_statistic;
use rs_subst_core::io::{list_files, normalize, parse_key};
use rs_subst_core::{
	CellPolicy, ChiSquareEvaluator, NGramCounter, ReferenceCounts, ReferenceDistribution, SubstError,
	SubstitutionCodec,
};

/// Folder scanned for `<name>.txt` reference tables.
const DATA_FOLDER: &str = "./data";

/// Query parameters for `/v1/encrypt` and `/v1/decrypt`
#[derive(Deserialize)]
struct CipherParams {
	key: String, // key-file format, e.g. "AZ BY CX"
	text: String,
}

/// Query parameters for `/v1/ngrams`
#[derive(Deserialize)]
struct NGramParams {
	order: Option<usize>,
	text: String,
}

/// Query parameters for `/v1/chi_square`
#[derive(Deserialize)]
struct ChiSquareParams {
	reference: String,
	order: Option<usize>,
	text: String,
	min_probability: Option<f64>,
	include_unobserved: Option<bool>,
}

#[derive(Deserialize)]
struct ReferenceQuery {
	names: Option<String>,
}

struct SharedData {
	references: BTreeMap<String, ReferenceCounts>,
}

impl ChiSquareParams {
	fn policy(&self) -> CellPolicy {
		if self.include_unobserved.unwrap_or(false) {
			CellPolicy::IncludeUnobserved
		} else {
			CellPolicy::ObservedOnly
		}
	}
}

/// Maps a core error to a response: caller mistakes are `400`, the rest `500`.
fn error_response(e: SubstError) -> HttpResponse {
	match e {
		SubstError::Io(_) | SubstError::Cache(_) | SubstError::ShardLost { .. } => {
			error!("{e}");
			HttpResponse::InternalServerError().body(e.to_string())
		}
		_ => HttpResponse::BadRequest().body(e.to_string()),
	}
}

fn cipher_response(params: &CipherParams, decrypt: bool) -> HttpResponse {
	let key = match parse_key(&params.key) {
		Ok(key) => key,
		Err(e) => return error_response(e),
	};
	let text = normalize(&params.text);
	let result = if decrypt {
		SubstitutionCodec::decrypt(&text, &key)
	} else {
		SubstitutionCodec::encrypt(&text, &key)
	};

	match result {
		Ok(bytes) => HttpResponse::Ok().body(bytes),
		Err(e) => error_response(e),
	}
}

/// HTTP GET endpoint `/v1/encrypt`
///
/// Normalizes `text` and substitutes it through `key`.
#[get("/v1/encrypt")]
async fn get_encrypted(query: web::Query<CipherParams>) -> impl Responder {
	cipher_response(&query, false)
}

/// HTTP GET endpoint `/v1/decrypt`
///
/// Normalizes `text` and substitutes it through the inverse of `key`.
#[get("/v1/decrypt")]
async fn get_decrypted(query: web::Query<CipherParams>) -> impl Responder {
	cipher_response(&query, true)
}

/// HTTP GET endpoint `/v1/ngrams`
///
/// Returns the n-gram table of `text`, one `"<ngram>   <count>"` line per
/// entry. `order` defaults to 1.
#[get("/v1/ngrams")]
async fn get_ngrams(query: web::Query<NGramParams>) -> impl Responder {
	let order = query.order.unwrap_or(1);
	match NGramCounter::count_auto(order, &normalize(&query.text)) {
		Ok(table) => HttpResponse::Ok().body(table.to_string()),
		Err(e) => error_response(e),
	}
}

/// HTTP GET endpoint `/v1/chi_square`
///
/// Scores `text` against a loaded reference table.
#[get("/v1/chi_square")]
async fn get_chi_square(
	data: web::Data<Mutex<SharedData>>,
	query: web::Query<ChiSquareParams>,
) -> impl Responder {
	let reference = {
		let shared_data = match data.lock() {
			Ok(m) => m,
			Err(_) => return HttpResponse::InternalServerError().body("Reference lock failed"),
		};
		let counts = match shared_data.references.get(&query.reference) {
			Some(counts) => counts,
			None => return HttpResponse::NotFound().body(format!("Reference {} is not loaded", query.reference)),
		};
		match query.min_probability {
			Some(min) => ReferenceDistribution::load_filtered(counts, min),
			None => ReferenceDistribution::load(counts),
		}
	};

	let reference = match reference {
		Ok(reference) => reference,
		Err(e) => return error_response(e),
	};

	let order = query.order.unwrap_or(1);
	match ChiSquareEvaluator::evaluate_text(order, &normalize(&query.text), &reference, query.policy()) {
		Ok(value) => HttpResponse::Ok().body(format_statistic(value)),
		Err(e) => error_response(e),
	}
}

#[get("/v1/references")]
async fn get_references() -> impl Responder {
	match list_files(DATA_FOLDER, "txt") {
		Ok(files) => HttpResponse::Ok().body(files.join("\n").replace(".txt", "")),
		Err(_) => HttpResponse::InternalServerError().body("Failed to list references"),
	}
}

#[get("/v1/loaded_references")]
async fn get_loaded_references(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Reference lock failed"),
	};
	let names: Vec<&str> = shared_data.references.keys().map(String::as_str).collect();
	HttpResponse::Ok().body(names.join("\n"))
}

/// A reference name must stay inside the data folder.
fn is_reference_name(name: &str) -> bool {
	!name.is_empty() && !name.contains(['/', '\\']) && !name.contains("..")
}

/// HTTP PUT endpoint `/v1/load_references?names=a,b`
///
/// Replaces the loaded set with `./data/<name>.txt` for each name. Names
/// carrying a path separator or `..` are refused before any file is read.
#[put("/v1/load_references")]
async fn put_references(
	data: web::Data<Mutex<SharedData>>,
	query: web::Query<ReferenceQuery>,
) -> impl Responder {
	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty reference name"),
	};

	let names: Vec<&str> = query_names.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
	if let Some(name) = names.iter().find(|name| !is_reference_name(name)) {
		return HttpResponse::BadRequest().body(format!("Invalid reference name {name}"));
	}

	let mut references = BTreeMap::new();
	for name in names {
		let path = format!("{DATA_FOLDER}/{name}.txt");
		match ReferenceCounts::from_file(&path) {
			Ok(counts) => {
				info!("loaded reference {name} ({} n-grams)", counts.len());
				references.insert(name.to_owned(), counts);
			}
			Err(e) => return HttpResponse::InternalServerError().body(format!("Failed to load reference: {e}")),
		}
	}

	let mut shared_data = match data.lock() {
		Ok(m) => m,
		Err(_) => return HttpResponse::InternalServerError().body("Reference lock failed"),
	};
	shared_data.references = references;

	HttpResponse::Ok().body("References loaded successfully")
}

/// Main entry point for the server.
///
/// Starts with no reference loaded; `PUT /v1/load_references` fills the
/// shared table set, guarded by a `Mutex`.
///
/// # Notes
/// - The server binds to 127.0.0.1:5000.
/// - Logging is configured through `RUST_LOG`.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	env_logger::init();

	let shared_data = SharedData { references: BTreeMap::new() };
	let shared_references = web::Data::new(Mutex::new(shared_data));

	info!("listening on 127.0.0.1:5000");
	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_references.clone())
			.service(get_encrypted)
			.service(get_decrypted)
			.service(get_ngrams)
			.service(get_chi_square)
			.service(get_references)
			.service(get_loaded_references)
			.service(put_references)
	})
		.bind(("127.0.0.1", 5000))?
		.run()
		.await
}
