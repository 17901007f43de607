//! End-to-end sync cycles against a fake Node-RED admin API

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use flow_deploy::{AdminClient, DeployMethod, DeployTier, Dispatcher, NullReload};
use serde_json::{json, Value};
use sync_engine::{
    CollectMode, MergingTransport, NullEventSink, SyncEngine, SyncPaths, WatchCoordinator,
    WatchSettings,
};

type Calls = Arc<Mutex<Vec<String>>>;

/// Fake admin API: partial deploys answer `partial_status`, `/flows` answers 200
async fn spawn_admin(partial_status: StatusCode) -> (SocketAddr, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let partial_calls = calls.clone();
    let flows_calls = calls.clone();
    let app = Router::new()
        .route(
            "/flows/partial",
            post(move || {
                let calls = partial_calls.clone();
                async move {
                    calls.lock().unwrap().push("partial".to_string());
                    partial_status
                }
            }),
        )
        .route(
            "/flows",
            post(move |headers: HeaderMap| {
                let calls = flows_calls.clone();
                async move {
                    let kind = headers
                        .get("Node-RED-Deployment-Type")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    calls.lock().unwrap().push(format!("flows:{}", kind));
                    StatusCode::OK
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, calls)
}

fn engine(root: &Path, addr: SocketAddr, flows: Value) -> Arc<SyncEngine> {
    let paths = SyncPaths {
        user_dir: root.to_path_buf(),
        flows_file: root.join("flows.json"),
        functions_dir: root.join("functions"),
    };
    std::fs::write(&paths.flows_file, serde_json::to_vec_pretty(&flows).unwrap()).unwrap();

    let client = AdminClient::new(format!("http://{}", addr));
    let dispatcher = Dispatcher::new(Arc::new(client), Arc::new(NullReload), DeployMethod::PartialHttp)
        .with_flows_file("flows.json");
    Arc::new(SyncEngine::new(paths, Arc::new(dispatcher), Arc::new(NullEventSink)))
}

/// Stock runtime: answers `POST /flows` and nothing else
async fn spawn_stock_runtime() -> (SocketAddr, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let flows_calls = calls.clone();
    let app = Router::new().route(
        "/flows",
        post(move |headers: HeaderMap| {
            let calls = flows_calls.clone();
            async move {
                let kind = headers
                    .get("Node-RED-Deployment-Type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                calls.lock().unwrap().push(format!("flows:{}", kind));
                StatusCode::NO_CONTENT
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, calls)
}

fn read_flows(engine: &SyncEngine) -> Value {
    serde_json::from_slice(&std::fs::read(&engine.paths().flows_file).unwrap()).unwrap()
}

#[tokio::test]
async fn edit_collect_and_deploy_partial() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, calls) = spawn_admin(StatusCode::NO_CONTENT).await;
    let engine = engine(
        dir.path(),
        addr,
        json!([
            {"id": "t1", "type": "tab", "label": "Main"},
            {"id": "f1", "type": "function", "z": "t1", "func": "return msg;"}
        ]),
    );

    assert_eq!(engine.extract_from_flows().await.unwrap(), vec!["f1.js"]);
    let file = engine.paths().functions_dir.join("f1.js");
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "return msg;");

    std::fs::write(&file, "return null;").unwrap();
    let report = engine.collect_changes(CollectMode::Verbose).await.unwrap();
    assert_eq!(report.changed_ids, vec!["f1"]);
    let deploy = report.deploy.unwrap();
    assert!(deploy.succeeded);
    assert_eq!(deploy.tier, Some(DeployTier::Partial));

    assert_eq!(read_flows(&engine)[1]["func"], "return null;");
    assert_eq!(*calls.lock().unwrap(), vec!["partial"]);
}

#[tokio::test]
async fn partial_failure_falls_back_to_full_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, calls) = spawn_admin(StatusCode::INTERNAL_SERVER_ERROR).await;
    let engine = engine(
        dir.path(),
        addr,
        json!([{"id": "f1", "type": "function", "func": "return msg;"}]),
    );

    engine.extract_from_flows().await.unwrap();
    std::fs::write(engine.paths().functions_dir.join("f1.js"), "return 1;").unwrap();
    let deploy = engine
        .collect_changes(CollectMode::Verbose)
        .await
        .unwrap()
        .deploy
        .unwrap();
    assert!(deploy.succeeded);
    assert_eq!(deploy.tier, Some(DeployTier::Full));

    // The next deploy starts at the full tier
    std::fs::write(engine.paths().functions_dir.join("f1.js"), "return 2;").unwrap();
    engine.collect_changes(CollectMode::Silent).await.unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["partial", "flows:reload", "flows:reload"]
    );
    assert_eq!(engine.dispatcher().preferred_tier(), DeployTier::Full);
}

#[tokio::test]
async fn partial_deploy_merges_locally_against_stock_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, calls) = spawn_stock_runtime().await;
    let paths = SyncPaths {
        user_dir: dir.path().to_path_buf(),
        flows_file: dir.path().join("flows.json"),
        functions_dir: dir.path().join("functions"),
    };
    std::fs::write(
        &paths.flows_file,
        serde_json::to_vec(&json!([
            {"id": "t1", "type": "tab", "label": "Main"},
            {"id": "f1", "type": "function", "z": "t1", "func": "return msg;"}
        ]))
        .unwrap(),
    )
    .unwrap();

    let admin = AdminClient::new(format!("http://{}", addr));
    let transport = MergingTransport::new(admin, paths.clone());
    let dispatcher = Dispatcher::new(Arc::new(transport), Arc::new(NullReload), DeployMethod::PartialHttp)
        .with_flows_file("flows.json");
    let engine = SyncEngine::new(paths, Arc::new(dispatcher), Arc::new(NullEventSink));

    engine.extract_from_flows().await.unwrap();
    for code in ["return 1;", "return 2;"] {
        std::fs::write(engine.paths().functions_dir.join("f1.js"), code).unwrap();
        let deploy = engine
            .collect_changes(CollectMode::Verbose)
            .await
            .unwrap()
            .deploy
            .unwrap();
        assert!(deploy.succeeded);
        assert_eq!(deploy.tier, Some(DeployTier::Partial));
        assert!(deploy.failures.is_empty());
        assert_eq!(read_flows(&engine)[1]["func"], code);
    }

    assert_eq!(*calls.lock().unwrap(), vec!["flows:nodes", "flows:nodes"]);
    assert_eq!(engine.dispatcher().preferred_tier(), DeployTier::Partial);
}

#[tokio::test]
async fn nested_layout_survives_a_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _) = spawn_admin(StatusCode::NO_CONTENT).await;
    let engine = engine(
        dir.path(),
        addr,
        json!([
            {"id": "t1", "type": "tab", "label": "Legacy", "nodes": [
                {"id": "f1", "type": "function", "func": "return msg;", "wires": [[]]}
            ]}
        ]),
    );

    engine.extract_from_flows().await.unwrap();
    std::fs::write(engine.paths().functions_dir.join("f1.js"), "return 7;").unwrap();
    engine.collect_changes(CollectMode::Verbose).await.unwrap();

    assert_eq!(
        read_flows(&engine),
        json!([
            {"id": "t1", "type": "tab", "label": "Legacy", "nodes": [
                {"id": "f1", "type": "function", "func": "return 7;", "wires": [[]]}
            ]}
        ])
    );
}

#[tokio::test]
async fn unknown_fields_are_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _) = spawn_admin(StatusCode::NO_CONTENT).await;
    let original = json!([
        {"id": "f1", "type": "function", "func": "a", "x": 10, "libs": [{"var": "fs", "module": "fs"}]},
        {"id": "c1", "type": "mqtt-broker", "broker": "localhost"}
    ]);
    let engine = engine(dir.path(), addr, original.clone());

    engine.extract_from_flows().await.unwrap();
    let report = engine.collect_changes(CollectMode::Verbose).await.unwrap();
    assert!(!report.changed());
    assert_eq!(read_flows(&engine), original);

    std::fs::write(engine.paths().functions_dir.join("f1.js"), "b").unwrap();
    engine.collect_changes(CollectMode::Verbose).await.unwrap();
    let mut expected = original;
    expected[0]["func"] = json!("b");
    assert_eq!(read_flows(&engine), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn watcher_collects_external_edit() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _) = spawn_admin(StatusCode::NO_CONTENT).await;
    let engine = engine(
        dir.path(),
        addr,
        json!([{"id": "f1", "type": "function", "func": "return msg;"}]),
    );
    engine.extract_from_flows().await.unwrap();

    let coordinator = WatchCoordinator::new(
        engine.guard().clone(),
        engine.clone(),
        WatchSettings {
            flow_debounce: Duration::from_millis(50),
            files_debounce: Duration::from_millis(50),
        },
    );
    coordinator
        .start(&engine.paths().flows_file, &engine.paths().functions_dir)
        .await
        .unwrap();

    std::fs::write(engine.paths().functions_dir.join("f1.js"), "return 'watched';").unwrap();

    let mut synced = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        // The file may be caught mid-write
        let current: Option<Value> = std::fs::read(&engine.paths().flows_file)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok());
        if current.is_some_and(|flows| flows[0]["func"] == "return 'watched';") {
            synced = true;
            break;
        }
    }
    coordinator.stop();
    assert!(synced, "external edit was not collected");
}
