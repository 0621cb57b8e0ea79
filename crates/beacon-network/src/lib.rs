//! # beacon-network
//!
//! 레코드 전송 계층.
//! 수집기별 유한 큐와 플러시 스케줄러(`BatchDispatcher`), 온라인/오프라인 추적
//! (`ConnectivityMonitor`), 원격 append-only 저장소 HTTP 클라이언트(`HttpRecordSink`)를 제공한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use beacon_network::batch_dispatcher::{BatchDispatcher, DispatcherConfig};
//! use beacon_network::connectivity::ConnectivityMonitor;
//! use beacon_network::http_sink::HttpRecordSink;
//!
//! let sink = Arc::new(HttpRecordSink::new("https://telemetry.example", None, timeout)?);
//! let dispatcher = BatchDispatcher::new(config, sink, Arc::new(ConnectivityMonitor::default()));
//! dispatcher.start();
//! ```

pub mod batch_dispatcher;
pub mod connectivity;
pub mod http_sink;
