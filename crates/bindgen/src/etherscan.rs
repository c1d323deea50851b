//! Resolves deployed contracts through the Etherscan API.

use crate::{
    config::EtherscanConfig,
    contracts::ContractSpec,
    metadata::{ContractMetadata, EtherscanContractMetadata},
    pipeline::{MetadataProvider, StagedFiles},
};
use contract_bindgen_artifacts_etherscan::{ApiResponse, RpcResponse};
use contract_bindgen_core::error::{BindgenError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fmt, thread, time::Duration};

static API_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"apikey=[^&\s]*").unwrap());

/// Replaces the value of every `apikey` query parameter in `s`.
pub fn redact_api_key(s: &str) -> String {
    API_KEY_RE.replace_all(s, "apikey=<redacted>").into_owned()
}

/// Performs blocking GET requests.
pub trait HttpClient {
    /// Returns the body of the response to a GET request to `url`.
    ///
    /// Responses with an error status still return their body, only requests that did not
    /// produce a response fail.
    fn get(&self, url: &str) -> Result<String>;
}

impl<T: HttpClient + ?Sized> HttpClient for &T {
    fn get(&self, url: &str) -> Result<String> {
        (**self).get(url)
    }
}

impl HttpClient for ureq::Agent {
    fn get(&self, url: &str) -> Result<String> {
        let transport_err = |message: String| BindgenError::Transport {
            url: redact_api_key(url),
            message: redact_api_key(&message),
        };
        let response = match ureq::Agent::get(self, url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                debug!(status, "request returned an error status");
                response
            }
            Err(err) => return Err(transport_err(err.to_string())),
        };
        response.into_string().map_err(|err| transport_err(err.to_string()))
    }
}

/// What Etherscan returned for a contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EtherscanArtifact {
    /// The JSON encoded ABI
    pub abi: String,
    /// The deployed bytecode as returned by `eth_getCode`
    pub bytecode: String,
}

/// Fetches ABIs and deployed bytecode from Etherscan.
///
/// ABI requests that hit the API rate limit are retried up to `max_retries` times, waiting
/// `retry_delay` in between. Every other failure is final.
pub struct EtherscanResolver<C = ureq::Agent> {
    client: C,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    retry_delay: Duration,
    sleep: Box<dyn Fn(Duration)>,
}

impl EtherscanResolver {
    /// A resolver that uses a blocking [`ureq::Agent`] with the configured timeouts.
    pub fn new(config: &EtherscanConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout())
            .timeout_connect(config.connect_timeout())
            .build();
        Self::with_client(agent, config)
    }
}

impl<C: HttpClient> EtherscanResolver<C> {
    pub fn with_client(client: C, config: &EtherscanConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay(),
            sleep: Box::new(thread::sleep),
        }
    }

    /// Overrides the delay between rate limited attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Replaces how the resolver waits between rate limited attempts.
    #[must_use]
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'static) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn abi_url(&self, address: &str) -> String {
        format!(
            "{}?module=contract&action=getabi&address={address}&apikey={}",
            self.endpoint, self.api_key
        )
    }

    pub fn bytecode_url(&self, address: &str) -> String {
        format!(
            "{}?module=proxy&action=eth_getCode&address={address}&tag=latest&apikey={}",
            self.endpoint, self.api_key
        )
    }

    /// Fetches the JSON encoded ABI of the contract.
    #[instrument(level = "debug", skip_all, fields(contract = %contract.name))]
    pub fn fetch_abi(&self, contract: &ContractSpec) -> Result<String> {
        let url = self.abi_url(&contract.deployed_address);
        for attempt in 1..=self.max_retries {
            let body = self.client.get(&url)?;
            let response: ApiResponse = serde_json::from_str(&body).map_err(|err| {
                error!("failed to parse Etherscan response as ApiResponse: {err}");
                BindgenError::MalformedResponse { url: redact_api_key(&url), err }
            })?;

            if response.is_rate_limited() {
                if attempt < self.max_retries {
                    warn!(
                        attempt,
                        "reached API rate limit, waiting {:?} and trying again", self.retry_delay
                    );
                    (self.sleep)(self.retry_delay);
                } else {
                    warn!(attempt, "reached API rate limit on the last attempt");
                }
                continue;
            }

            if !response.is_ok() {
                return Err(BindgenError::EtherscanStatus {
                    url: redact_api_key(&url),
                    response: response.to_string(),
                });
            }

            trace!(attempt, "fetched ABI");
            return Ok(response.result);
        }

        Err(BindgenError::RetriesExhausted {
            contract: contract.name.clone(),
            retries: self.max_retries,
        })
    }

    /// Fetches the code deployed at the contract's address.
    ///
    /// The result is not validated, an empty account yields `0x`.
    #[instrument(level = "debug", skip_all, fields(contract = %contract.name))]
    pub fn fetch_bytecode(&self, contract: &ContractSpec) -> Result<String> {
        let url = self.bytecode_url(&contract.deployed_address);
        let body = self.client.get(&url)?;
        let response: RpcResponse = serde_json::from_str(&body).map_err(|err| {
            error!("failed to parse Etherscan response as RpcResponse: {err}");
            BindgenError::MalformedResponse { url: redact_api_key(&url), err }
        })?;
        Ok(response.result)
    }
}

impl<C: HttpClient> MetadataProvider for EtherscanResolver<C> {
    type Contract = ContractSpec;
    type Artifact = EtherscanArtifact;

    const KIND: &'static str = "Etherscan";

    fn resolve(&self, contract: &ContractSpec) -> Result<EtherscanArtifact> {
        if let Some(predeploy) = &contract.predeploy_address {
            debug!(contract = %contract.name, %predeploy, "contract has a predeploy address");
        }
        let abi = self.fetch_abi(contract)?;
        let bytecode = self.fetch_bytecode(contract)?;
        Ok(EtherscanArtifact { abi, bytecode })
    }

    fn staged_files(&self, artifact: &EtherscanArtifact) -> Result<StagedFiles> {
        Ok(StagedFiles {
            abi: artifact.abi.clone().into_bytes(),
            bytecode: artifact.bytecode.clone().into_bytes(),
        })
    }

    fn metadata(
        &self,
        contract: &ContractSpec,
        artifact: EtherscanArtifact,
        package: &str,
    ) -> Result<ContractMetadata> {
        Ok(ContractMetadata::Etherscan(EtherscanContractMetadata {
            name: contract.name.clone(),
            package: package.to_string(),
            deployed_bin: artifact.bytecode,
        }))
    }
}

impl<C: fmt::Debug> fmt::Debug for EtherscanResolver<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtherscanResolver")
            .field("client", &self.client)
            .field("endpoint", &self.endpoint)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, collections::VecDeque, rc::Rc};

    const RATE_LIMITED: &str = r#"{"status":"0","message":"NOTOK","result":"Max rate limit reached"}"#;
    const ABI_OK: &str = r#"{"status":"1","message":"OK","result":"[{\"type\":\"fallback\"}]"}"#;

    /// Replays canned bodies and records every requested url.
    #[derive(Debug, Default)]
    struct Replay {
        bodies: RefCell<VecDeque<Result<String>>>,
        urls: RefCell<Vec<String>>,
    }

    impl Replay {
        fn new(bodies: impl IntoIterator<Item = &'static str>) -> Self {
            Self {
                bodies: RefCell::new(bodies.into_iter().map(|b| Ok(b.to_string())).collect()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.urls.borrow().len()
        }
    }

    impl HttpClient for Replay {
        fn get(&self, url: &str) -> Result<String> {
            self.urls.borrow_mut().push(url.to_string());
            self.bodies.borrow_mut().pop_front().unwrap_or_else(|| Ok(RATE_LIMITED.to_string()))
        }
    }

    fn spec() -> ContractSpec {
        ContractSpec {
            name: "MultiCall3".to_string(),
            deployed_address: "0xcA11bde05977b3631167028862bE2a173976CA11".to_string(),
            predeploy_address: None,
        }
    }

    fn config(max_retries: u32) -> EtherscanConfig {
        EtherscanConfig::default()
            .with_api_key("secret")
            .with_endpoint("https://api.example.io/api")
            .with_retries(max_retries, 7)
    }

    fn make_resolver(
        client: &Replay,
        max_retries: u32,
    ) -> (EtherscanResolver<&Replay>, Rc<RefCell<Vec<Duration>>>) {
        let sleeps = Rc::new(RefCell::new(Vec::new()));
        let recorded = sleeps.clone();
        let resolver = EtherscanResolver::with_client(client, &config(max_retries))
            .with_sleep(move |delay| recorded.borrow_mut().push(delay));
        (resolver, sleeps)
    }

    #[test]
    fn builds_urls() {
        let client = Replay::default();
        let (resolver, _) = make_resolver(&client, 3);
        assert_eq!(
            resolver.abi_url("0xabc"),
            "https://api.example.io/api?module=contract&action=getabi&address=0xabc&apikey=secret"
        );
        assert_eq!(
            resolver.bytecode_url("0xabc"),
            "https://api.example.io/api?module=proxy&action=eth_getCode&address=0xabc&tag=latest&apikey=secret"
        );
    }

    #[test]
    fn gives_up_after_max_retries() {
        let client = Replay::default();
        let (resolver, sleeps) = make_resolver(&client, 4);
        let err = resolver.fetch_abi(&spec()).unwrap_err();
        assert!(matches!(err, BindgenError::RetriesExhausted { retries: 4, .. }));
        assert_eq!(err.to_string(), "failed to fetch ABI of MultiCall3 after 4 retries");
        assert_eq!(client.calls(), 4);
        assert_eq!(*sleeps.borrow(), vec![Duration::from_secs(7); 3]);
    }

    #[test]
    fn recovers_from_rate_limit() {
        let client = Replay::new([RATE_LIMITED, RATE_LIMITED, ABI_OK]);
        let (resolver, sleeps) = make_resolver(&client, 3);
        let abi = resolver.fetch_abi(&spec()).unwrap();
        assert_eq!(abi, r#"[{"type":"fallback"}]"#);
        assert_eq!(client.calls(), 3);
        assert_eq!(sleeps.borrow().len(), 2);
    }

    #[test]
    fn other_failures_are_not_retried() {
        let client = Replay::new([r#"{"status":"0","message":"NOTOK","result":"Invalid API Key"}"#]);
        let (resolver, sleeps) = make_resolver(&client, 5);
        let err = resolver.fetch_abi(&spec()).unwrap_err();
        assert!(matches!(err, BindgenError::EtherscanStatus { .. }));
        let msg = err.to_string();
        assert!(msg.contains("Invalid API Key"));
        assert!(msg.contains("apikey=<redacted>"));
        assert!(!msg.contains("secret"));
        assert_eq!(client.calls(), 1);
        assert!(sleeps.borrow().is_empty());

        let client = Replay::new(["<html>502 Bad Gateway</html>"]);
        let (resolver, _) = make_resolver(&client, 5);
        let err = resolver.fetch_abi(&spec()).unwrap_err();
        assert!(matches!(err, BindgenError::MalformedResponse { .. }));
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn transport_errors_abort_immediately() {
        let client = Replay::default();
        client.bodies.borrow_mut().push_back(Err(BindgenError::Transport {
            url: "https://api.example.io/api".to_string(),
            message: "connection refused".to_string(),
        }));
        let (resolver, _) = make_resolver(&client, 3);
        let err = resolver.fetch_abi(&spec()).unwrap_err();
        assert!(matches!(err, BindgenError::Transport { .. }));
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn bytecode_is_passed_through() {
        let client = Replay::new([r#"{"jsonrpc":"2.0","id":1,"result":"0x"}"#]);
        let (resolver, _) = make_resolver(&client, 3);
        assert_eq!(resolver.fetch_bytecode(&spec()).unwrap(), "0x");
        assert!(client.urls.borrow()[0].contains("action=eth_getCode"));
    }

    #[test]
    fn zero_retries_never_requests() {
        let client = Replay::default();
        let (resolver, _) = make_resolver(&client, 0);
        let err = resolver.fetch_abi(&spec()).unwrap_err();
        assert!(matches!(err, BindgenError::RetriesExhausted { retries: 0, .. }));
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn redacts_api_keys() {
        assert_eq!(
            redact_api_key("https://x/api?module=proxy&apikey=abc123&tag=latest"),
            "https://x/api?module=proxy&apikey=<redacted>&tag=latest"
        );
        assert_eq!(redact_api_key("no key here"), "no key here");
    }
}
