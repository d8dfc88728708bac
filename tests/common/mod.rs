use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// A request as seen by the test server.
#[derive(Debug, Clone)]
pub struct Hit {
    pub path: String,
    pub user_agent: Option<String>,
}

/// Local HTTP server answering fixed routes; unknown paths get 404. Stops on drop.
pub struct TestServer {
    pub base_url: String,
    hits: Arc<Mutex<Vec<Hit>>>,
    shutdown: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    pub fn start(routes: Vec<(&str, u16, String)>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}", server.server_addr());
        let routes: HashMap<String, (u16, String)> = routes
            .into_iter()
            .map(|(path, status, body)| (path.to_string(), (status, body)))
            .collect();
        let hits = Arc::new(Mutex::new(Vec::new()));
        let (shutdown, shutdown_rx) = mpsc::channel::<()>();

        let seen = Arc::clone(&hits);
        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };
            let path = request.url().to_string();
            let user_agent = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("User-Agent"))
                .map(|h| h.value.as_str().to_string());
            seen.lock().expect("hits lock").push(Hit {
                path: path.clone(),
                user_agent,
            });

            let (status, body) = routes
                .get(&path)
                .cloned()
                .unwrap_or((404, "not found".to_string()));
            let header = tiny_http::Header::from_bytes(
                &b"Content-Type"[..],
                &b"text/html; charset=utf-8"[..],
            )
            .expect("content-type header");
            let _ = request.respond(
                tiny_http::Response::from_string(body)
                    .with_status_code(status)
                    .with_header(header),
            );
        });

        Self {
            base_url,
            hits,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.hits.lock().expect("hits lock").clone()
    }

    pub fn hit_count(&self, path: &str) -> usize {
        self.hits().iter().filter(|h| h.path == path).count()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// A chapter page with the default selectors: `h3.chapter-title`, `div.chapter-content`, `a#next_chap`.
#[allow(dead_code)]
pub fn chapter_page(title: &str, body: Option<&str>, next: Option<&str>) -> String {
    let content = body
        .map(|b| format!("<div class=\"chapter-content\"><p>{}</p></div>", b))
        .unwrap_or_default();
    let link = next
        .map(|n| format!("<a id=\"next_chap\" href=\"{}\">Next Chapter</a>", n))
        .unwrap_or_else(|| "<a id=\"prev_chap\" href=\"#\">Previous</a>".to_string());
    format!(
        "<!DOCTYPE html><html><head><title>{t}</title></head><body>\
         <h3 class=\"chapter-title\">{t}</h3>{content}{link}</body></html>",
        t = title,
        content = content,
        link = link
    )
}
