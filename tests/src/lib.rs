#[cfg(test)]
mod tests {
    use futures::Future;
    use httpdump::{
        replay_test, ErrorRecord, Exchange, LogReader, Recorder, RecorderConfiguration,
        ReplayConfiguration,
    };
    use hyper::{
        body,
        service::{make_service_fn, service_fn},
        Body, Request, Response, Server, StatusCode,
    };
    use lazy_static::lazy_static;
    use std::{
        convert::Infallible,
        net::{SocketAddr, TcpListener},
        path::Path,
        sync::Arc,
        thread,
    };
    use tokio::{runtime::Runtime, sync::oneshot};

    lazy_static! {
        static ref HELLO_BACKEND: SocketAddr = start_hello_backend();
    }

    async fn hello_backend(request: Request<Body>) -> Result<Response<Body>, Infallible> {
        let response = match request.uri().path() {
            "/hello" => Response::builder()
                .header("content-type", "text/plain")
                .header("date", format!("{:?}", std::time::SystemTime::now()))
                .body(Body::from("hi")),
            "/echo" => {
                let body = body::to_bytes(request.into_body()).await.unwrap();
                Response::builder().status(201).body(Body::from(body))
            }
            _ => Response::builder()
                .status(404)
                .body(Body::from("404 page not found")),
        };

        Ok(response.unwrap())
    }

    async fn not_found_backend(_: Request<Body>) -> Result<Response<Body>, Infallible> {
        Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("404 page not found"))
            .unwrap())
    }

    /// Runs a backend on its own thread so plain, runtime-less tests can use it.
    fn start_hello_backend() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();

        thread::spawn(move || {
            Runtime::new().unwrap().block_on(async {
                listener.set_nonblocking(true).unwrap();
                let server = Server::from_tcp(listener)
                    .unwrap()
                    .serve(make_service_fn(|_| async {
                        Ok::<_, Infallible>(service_fn(hello_backend))
                    }));

                if let Err(e) = server.await {
                    eprintln!("Test backend error: {}", e);
                }
            });
        });

        address
    }

    fn spawn_backend<F, Fut>(handler: F) -> SocketAddr
    where
        F: Fn(Request<Body>) -> Fut + Copy + Send + 'static,
        Fut: Future<Output = Result<Response<Body>, Infallible>> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let address = listener.local_addr().unwrap();

        let server = Server::from_tcp(listener)
            .unwrap()
            .serve(make_service_fn(move |_| async move {
                Ok::<_, Infallible>(service_fn(handler))
            }));
        tokio::spawn(server);

        address
    }

    /// Starts a recording proxy in front of `backend`; dropping the sender stops it.
    fn spawn_recorder(backend: SocketAddr, dump_path: &Path) -> (SocketAddr, oneshot::Sender<()>) {
        let mut configuration = RecorderConfiguration::new(format!("http://{}", backend));
        configuration.set_dump_path(dump_path);
        let recorder = Recorder::from_configuration(&configuration).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        tokio::spawn(httpdump::serve(listener, Arc::new(recorder), async {
            let _ = stopped.await;
        }));

        (address, stop)
    }

    fn replay_configuration(dump_path: &Path, target: SocketAddr, error_log: &Path) -> ReplayConfiguration {
        let mut configuration = ReplayConfiguration::new(dump_path);
        configuration.set_target(format!("http://{}/", target));
        configuration.set_error_log_path(error_log);
        configuration
    }

    fn read_lines<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
        LogReader::open(path)
            .unwrap()
            .map(|line| serde_json::from_slice(&line.unwrap().bytes).unwrap())
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn recorded_hello_replays_cleanly_against_the_same_backend() {
        let dir = tempfile::tempdir().unwrap();
        let dump_path = dir.path().join("httpdump.json");
        let error_log = dir.path().join("errorlog.json");
        let backend = spawn_backend(hello_backend);
        let (proxy, _stop) = spawn_recorder(backend, &dump_path);

        let response = reqwest::get(format!("http://{}/hello", proxy)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "hi");

        let exchanges: Vec<Exchange> = read_lines(&dump_path);
        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].request.method, "GET");
        assert_eq!(exchanges[0].request.url, "/hello");
        assert_eq!(exchanges[0].request.host, proxy.to_string());
        assert_eq!(exchanges[0].response.status, "200 OK");
        assert_eq!(exchanges[0].response.body, b"hi");

        let summary = httpdump::run_replay(&replay_configuration(&dump_path, backend, &error_log))
            .await
            .unwrap();

        assert_eq!(summary.replayed, 1);
        assert_eq!(summary.divergent, 0);
        assert!(read_lines::<ErrorRecord>(&error_log).is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn replay_against_a_missing_route_reports_one_divergence() {
        let dir = tempfile::tempdir().unwrap();
        let dump_path = dir.path().join("httpdump.json");
        let error_log = dir.path().join("errorlog.json");
        let backend = spawn_backend(hello_backend);
        let (proxy, _stop) = spawn_recorder(backend, &dump_path);

        reqwest::get(format!("http://{}/hello", proxy)).await.unwrap();

        let target = spawn_backend(not_found_backend);
        let summary = httpdump::run_replay(&replay_configuration(&dump_path, target, &error_log))
            .await
            .unwrap();

        assert_eq!(summary.replayed, 1);
        assert_eq!(summary.divergent, 1);
        let records: Vec<ErrorRecord> = read_lines(&error_log);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].expected.status, "200 OK");
        assert_eq!(records[0].response.status, "404 Not Found");
        assert_eq!(records[0].request.url, "/hello");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_requests_are_recorded_on_separate_lines() {
        let dir = tempfile::tempdir().unwrap();
        let dump_path = dir.path().join("httpdump.json");
        let backend = spawn_backend(hello_backend);
        let (proxy, _stop) = spawn_recorder(backend, &dump_path);
        let client = reqwest::Client::new();

        let first_body = "1".repeat(512 * 1024);
        let second_body = "2".repeat(512 * 1024);
        let (first, second) = tokio::join!(
            client
                .post(format!("http://{}/echo", proxy))
                .body(first_body.clone())
                .send(),
            client
                .post(format!("http://{}/echo", proxy))
                .body(second_body.clone())
                .send(),
        );
        assert_eq!(first.unwrap().bytes().await.unwrap(), first_body.as_bytes());
        assert_eq!(second.unwrap().bytes().await.unwrap(), second_body.as_bytes());

        let exchanges: Vec<Exchange> = read_lines(&dump_path);
        assert_eq!(exchanges.len(), 2);
        for exchange in exchanges {
            assert_eq!(exchange.response.status, "201 Created");
            assert_eq!(exchange.request.body, exchange.response.body);
            assert!(
                exchange.request.body == first_body.as_bytes()
                    || exchange.request.body == second_body.as_bytes()
            );
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stops_on_shutdown_signal() {
        let dir = tempfile::tempdir().unwrap();
        let mut configuration = RecorderConfiguration::new("http://127.0.0.1:9");
        configuration.set_listen_address("127.0.0.1:0");
        configuration.set_dump_path(dir.path().join("httpdump.json"));

        httpdump::run_recorder(configuration, async {}).await.unwrap();

        assert!(dir.path().join("httpdump.json").exists());
    }

    #[test]
    fn truncated_dump_yields_only_complete_lines() {
        let exchanges: Vec<Exchange> = read_lines(Path::new("fixtures/truncated.json"));

        assert_eq!(exchanges.len(), 1);
        assert_eq!(exchanges[0].request.url, "/hello");
    }

    fn replay_against_hello_backend(configuration: &mut ReplayConfiguration) {
        configuration.set_target(format!("http://{}/", *HELLO_BACKEND));
        configuration.set_error_log_path(std::env::temp_dir().join("httpdump-hello-errors.json"));
    }

    fn replay_truncated_against_hello_backend(configuration: &mut ReplayConfiguration) {
        configuration.set_target(format!("http://{}", *HELLO_BACKEND));
        configuration
            .set_error_log_path(std::env::temp_dir().join("httpdump-truncated-errors.json"));
    }

    #[replay_test("fixtures/hello.json", replay_against_hello_backend)]
    fn recorded_hello_still_matches() {}

    #[replay_test("fixtures/truncated.json", replay_truncated_against_hello_backend)]
    fn truncated_dump_replays_its_complete_lines() {}
}
