//! Property tests for form encoding and header attachment.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use helper_core::params::decode_component;
use helper_core::{
    encode_params, Connection, ConnectOptions, HttpMethod, HttpResponse, Mode, Provider, RequestDescriptor, Transport,
    TransportError,
};
use proptest::prelude::*;

/// Records every header set on it.
struct Recording {
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl Connection for Recording {
    fn open(&mut self, _method: HttpMethod, _url: &str, _asynchronous: bool) -> Result<(), TransportError> {
        Ok(())
    }

    fn set_request_header(&mut self, name: &str, value: &str) {
        self.seen.lock().unwrap().push((name.to_string(), value.to_string()));
    }

    fn send(self: Box<Self>, _body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status: 200,
            ..Default::default()
        })
    }
}

struct RecordingProvider {
    seen: Arc<Mutex<Vec<(String, String)>>>,
}

impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    fn create(&self, _options: &ConnectOptions) -> Option<Box<dyn Connection>> {
        Some(Box::new(Recording {
            seen: self.seen.clone(),
        }))
    }
}

fn header_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9-]{0,12}"
}

proptest! {
    #[test]
    fn every_header_is_attached_exactly_once(
        headers in prop::collection::vec((header_name(), "[ -~]{0,16}"), 0..12),
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let transport = Transport::builder()
            .provider(RecordingProvider { seen: seen.clone() })
            .build();

        let mut descriptor = RequestDescriptor::new("/x");
        for (name, value) in &headers {
            descriptor = descriptor.header(name.clone(), value.clone());
        }
        let expected: BTreeMap<String, String> = headers.into_iter().collect();

        transport.dispatch(descriptor, Mode::Sync).unwrap();

        let seen = seen.lock().unwrap().clone();
        prop_assert_eq!(seen.len(), expected.len());
        let attached: BTreeMap<String, String> = seen.into_iter().collect();
        prop_assert_eq!(attached, expected);
    }

    #[test]
    fn encoded_params_round_trip(
        params in prop::collection::vec(("[a-z]{1,8}", "\\PC{0,16}"), 0..8),
    ) {
        let encoded = encode_params(params.iter().map(|(k, v)| (k, v)));

        if params.is_empty() {
            prop_assert_eq!(encoded.as_str(), "");
        } else {
            prop_assert_eq!(encoded.matches('&').count(), params.len() - 1);
            let pairs: Vec<&str> = encoded.split('&').collect();
            prop_assert_eq!(pairs.len(), params.len());
            for (pair, (key, value)) in pairs.iter().zip(&params) {
                let (k, v) = pair.split_once('=').unwrap();
                prop_assert_eq!(k, key.as_str());
                let decoded = decode_component(v);
                prop_assert_eq!(decoded.as_deref(), Some(value.as_str()));
            }
        }
    }

    #[test]
    fn keys_pass_through_verbatim(key in "[a-z ]{1,8}/?", value in "[a-z]{0,4}") {
        let encoded = encode_params([(key.as_str(), value.as_str())]);
        prop_assert_eq!(encoded, format!("{key}={value}"));
    }
}
