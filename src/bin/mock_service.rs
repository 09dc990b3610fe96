//! Mock study assistant service for integration testing
//!
//! Serves the key provisioning, identity, ingest and chat endpoints from
//! memory so the acceptance suite can run without a real deployment. Each
//! fault flag breaks exactly one part of the contract.

use clap::Parser;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use tiny_http::{Header, Method, Request, Response, Server};

const NOT_FOUND_ANSWER: &str = "Not found in knowledge base.";
const BEDROCK_DISABLED_ANSWER: &str = "Bedrock generation disabled. \
    Retrieval completed successfully; enable USE_BEDROCK to generate answers.";

#[derive(Parser, Debug)]
#[command(name = "mock-service", about = "In-memory RAG study assistant for tests")]
struct Args {
    /// Port to bind on 127.0.0.1 (0 picks a free port)
    #[arg(long, default_value = "0")]
    port: u16,

    /// Admin key accepted by the provisioning endpoint
    #[arg(long, default_value = "admin")]
    admin_key: String,

    /// Share notebooks between tenants by name (breaks isolation)
    #[arg(long)]
    leak_notebooks: bool,

    /// Response field carrying the chat answer ("none" embeds it elsewhere)
    #[arg(long, default_value = "answer")]
    answer_field: String,

    /// Report a different user_id from /v1/me
    #[arg(long)]
    identity_drift: bool,

    /// Acknowledge ingests with an empty body
    #[arg(long)]
    empty_ingest: bool,

    /// Hand every new key the same user_id
    #[arg(long)]
    reuse_keys: bool,

    /// Answer every chat with the canned "generation disabled" text
    #[arg(long)]
    bedrock_disabled: bool,
}

fn main() {
    let args = Args::parse();

    let server = match Server::http(("127.0.0.1", args.port)) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("mock-service: failed to bind: {}", e);
            std::process::exit(1);
        }
    };
    let addr = server
        .server_addr()
        .to_ip()
        .map(|a| a.to_string())
        .unwrap_or_else(|| format!("127.0.0.1:{}", args.port));

    let mut stdout = std::io::stdout();
    writeln!(stdout, "mock-service listening at: http://{}", addr).ok();
    stdout.flush().ok();

    let mut state = MockState::new(args);

    for mut request in server.incoming_requests() {
        let response = state.handle(&mut request);
        request.respond(response).ok();
    }
}

struct Document {
    doc_id: String,
    text: String,
}

struct MockState {
    args: Args,
    next_user: u64,
    keys: HashMap<String, String>, // api_key -> user_id
    notebooks: HashMap<(String, String), Vec<Document>>, // (user_id, notebook) -> docs
}

impl MockState {
    fn new(args: Args) -> Self {
        Self {
            args,
            next_user: 0,
            keys: HashMap::new(),
            notebooks: HashMap::new(),
        }
    }

    fn handle(&mut self, request: &mut Request) -> Response<Cursor<Vec<u8>>> {
        let path = request.url().split('?').next().unwrap_or("").to_string();
        let method = request.method().clone();

        match (method, path.as_str()) {
            (Method::Get, "/health") => json_response(200, &json!({"status": "ok"})),
            (Method::Get, "/bedrock/status") => json_response(
                200,
                &json!({
                    "use_bedrock": !self.args.bedrock_disabled,
                    "region": "us-east-1",
                    "embedding_model_id": "mock-embed",
                    "chat_model_id": "mock-chat",
                    "bedrock_control_plane_ok": true,
                    "bedrock_runtime_ok": true,
                    "embedding_invoke_ok": true,
                    "embedding_dim": 8,
                    "chat_invoke_ok": !self.args.bedrock_disabled,
                    "errors": [],
                }),
            ),
            (Method::Post, "/admin/create_user_key") => self.create_user_key(request),
            (Method::Get, "/v1/me") => match self.authenticate(request) {
                Ok(user_id) => {
                    let user_id = if self.args.identity_drift {
                        format!("{}-drifted", user_id)
                    } else {
                        user_id
                    };
                    json_response(200, &json!({"user_id": user_id, "label": null}))
                }
                Err(response) => response,
            },
            (Method::Post, "/v1/ingest") => self.ingest(request),
            (Method::Post, "/v1/chat") => self.chat(request),
            _ => detail(404, "Not Found"),
        }
    }

    fn create_user_key(&mut self, request: &Request) -> Response<Cursor<Vec<u8>>> {
        if header(request, "x-admin-key").as_deref() != Some(self.args.admin_key.as_str()) {
            return detail(403, "Invalid admin key");
        }

        self.next_user += 1;
        let user_id = if self.args.reuse_keys {
            "00000000-0000-0000-0000-000000000001".to_string()
        } else {
            format!(
                "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
                rand::random::<u32>(),
                self.next_user & 0xffff,
                rand::random::<u16>() & 0xfff,
                rand::random::<u16>(),
                rand::random::<u64>() & 0xffff_ffff_ffff
            )
        };
        let api_key = format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>());
        self.keys.insert(api_key.clone(), user_id.clone());

        json_response(200, &json!({"user_id": user_id, "api_key": api_key}))
    }

    fn authenticate(&self, request: &Request) -> Result<String, Response<Cursor<Vec<u8>>>> {
        let key = header(request, "x-api-key").ok_or_else(|| detail(401, "Missing X-API-Key"))?;
        self.keys
            .get(&key)
            .cloned()
            .ok_or_else(|| detail(401, "Invalid API key"))
    }

    fn scope(&self, user_id: String, notebook: &str) -> (String, String) {
        if self.args.leak_notebooks {
            (String::new(), notebook.to_string())
        } else {
            (user_id, notebook.to_string())
        }
    }

    fn ingest(&mut self, request: &mut Request) -> Response<Cursor<Vec<u8>>> {
        let user_id = match self.authenticate(request) {
            Ok(user_id) => user_id,
            Err(response) => return response,
        };
        let body = match read_json(request) {
            Some(body) => body,
            None => return detail(422, "Body must be JSON"),
        };
        let notebook = body.get("notebook").and_then(Value::as_str).unwrap_or("default");
        let text = body.get("text").and_then(Value::as_str).unwrap_or("");
        if text.trim().is_empty() {
            return detail(400, "text is empty");
        }

        let doc_id = format!("doc-{:08x}", rand::random::<u32>());
        let scope = self.scope(user_id, notebook);
        self.notebooks.entry(scope).or_default().push(Document {
            doc_id: doc_id.clone(),
            text: text.to_string(),
        });

        if self.args.empty_ingest {
            return Response::from_string("").with_status_code(200);
        }
        json_response(200, &json!({"doc_id": doc_id, "chunks_added": 1}))
    }

    fn chat(&mut self, request: &mut Request) -> Response<Cursor<Vec<u8>>> {
        let user_id = match self.authenticate(request) {
            Ok(user_id) => user_id,
            Err(response) => return response,
        };
        let body = match read_json(request) {
            Some(body) => body,
            None => return detail(422, "Body must be JSON"),
        };
        let notebook = body.get("notebook").and_then(Value::as_str).unwrap_or("default");
        let question = body.get("question").and_then(Value::as_str).unwrap_or("");
        if question.trim().is_empty() {
            return detail(400, "question is empty");
        }

        let terms = keywords(question);
        let hits: Vec<&Document> = self
            .notebooks
            .get(&self.scope(user_id, notebook))
            .map(|docs| {
                docs.iter()
                    .filter(|d| keywords(&d.text).iter().any(|w| terms.contains(w)))
                    .collect()
            })
            .unwrap_or_default();

        let answer = if hits.is_empty() {
            NOT_FOUND_ANSWER.to_string()
        } else if self.args.bedrock_disabled {
            BEDROCK_DISABLED_ANSWER.to_string()
        } else {
            hits.iter().map(|d| d.text.as_str()).collect::<Vec<_>>().join(" ")
        };
        let sources: Vec<Value> = hits
            .iter()
            .enumerate()
            .map(|(i, d)| json!({"doc_id": d.doc_id, "chunk_index": i}))
            .collect();

        let mut response = serde_json::Map::new();
        let field = match self.args.answer_field.as_str() {
            "none" => "text",
            other => other,
        };
        response.insert(field.to_string(), Value::String(answer));
        response.insert("grounded".to_string(), Value::Bool(!hits.is_empty()));
        response.insert("sources".to_string(), Value::Array(sources));
        json_response(200, &Value::Object(response))
    }
}

/// Lowercase alphanumeric words of four or more characters
fn keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 4)
        .map(str::to_lowercase)
        .collect()
}

fn header(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str().to_string())
}

fn read_json(request: &mut Request) -> Option<Value> {
    let mut body = String::new();
    request.as_reader().read_to_string(&mut body).ok()?;
    serde_json::from_str(&body).ok()
}

fn json_response(status: u16, body: &Value) -> Response<Cursor<Vec<u8>>> {
    let content_type = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("static header is valid");
    Response::from_string(body.to_string())
        .with_status_code(status)
        .with_header(content_type)
}

fn detail(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    json_response(status, &json!({"detail": message}))
}
