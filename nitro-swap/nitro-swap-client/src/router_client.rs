//! A client for the Router Nitro pay API
//!
//! The [`RoutingApi`] trait is the seam the quote fetcher and settlement
//! poller are written against; [`NitroClient`] is the HTTP implementation

use async_trait::async_trait;
use nitro_swap_api::{
    DepositStatusParams, DepositStatusResponse, QuoteRequestParams, QuoteResponse,
    DEPOSIT_STATUS_ROUTE, SWAP_QUOTE_ROUTE,
};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{instrument, warn};

use crate::{
    config::SwapFlowConfig,
    error::{SwapFlowError, SwapFlowResult},
};

// -------------
// | Constants |
// -------------

/// The header carrying the router API key
const ROUTER_API_KEY_HEADER: &str = "x-api-key";

// ---------
// | Trait |
// ---------

/// The operations the swap flow needs from a routing backend
#[async_trait]
pub trait RoutingApi: Send + Sync {
    /// Fetch a quote and a fresh deposit address for a swap
    async fn get_quote(&self, params: &QuoteRequestParams) -> SwapFlowResult<QuoteResponse>;

    /// Fetch the settlement status of a deposit address
    async fn get_deposit_status(
        &self,
        params: &DepositStatusParams,
    ) -> SwapFlowResult<DepositStatusResponse>;
}

// ----------
// | Client |
// ----------

/// An HTTP client for the Router Nitro pay API
#[derive(Clone)]
pub struct NitroClient {
    /// The base url of the API, without a trailing slash
    base_url: String,
    /// The API key to use for requests
    api_key: Option<String>,
    /// The underlying HTTP client
    http_client: Client,
}

impl NitroClient {
    /// Create a new client from the flow config
    pub fn new(config: &SwapFlowConfig) -> SwapFlowResult<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(SwapFlowError::setup)?;

        Ok(Self {
            base_url: config.router_api_base_url.trim_end_matches('/').to_string(),
            api_key: config.router_api_key.clone(),
            http_client,
        })
    }

    /// Build the url of a route with the given query parameters
    fn build_url<P: Serialize>(&self, route: &str, params: &P) -> SwapFlowResult<String> {
        let query = serde_qs::to_string(params).map_err(SwapFlowError::parse)?;
        Ok(format!("{}/{route}?{query}", self.base_url))
    }

    /// Send a get request to the router API
    async fn send_get_request<P: Serialize>(
        &self,
        route: &str,
        params: &P,
    ) -> SwapFlowResult<Response> {
        let url = self.build_url(route, params)?;

        let mut request = self.http_client.get(url);
        if let Some(api_key) = &self.api_key {
            request = request.header(ROUTER_API_KEY_HEADER, api_key.as_str());
        }

        Ok(request.send().await?)
    }
}

#[async_trait]
impl RoutingApi for NitroClient {
    #[instrument(skip_all, fields(
        from_chain = params.from_token_chain_id,
        to_chain = params.to_token_chain_id,
    ))]
    async fn get_quote(&self, params: &QuoteRequestParams) -> SwapFlowResult<QuoteResponse> {
        let response = self.send_get_request(SWAP_QUOTE_ROUTE, params).await?;
        match handle_http_response(response).await {
            // The router answers unroutable pairs and out-of-range amounts with a 4xx
            Err(HttpFailure::Client(status, body)) => {
                warn!("router rejected quote request ({status}): {body}");
                Err(SwapFlowError::quote_unavailable(format!("{status}: {body}")))
            },
            res => res.map_err(SwapFlowError::from),
        }
    }

    #[instrument(skip_all, fields(deposit_address = %params.deposit_address))]
    async fn get_deposit_status(
        &self,
        params: &DepositStatusParams,
    ) -> SwapFlowResult<DepositStatusResponse> {
        let response = self.send_get_request(DEPOSIT_STATUS_ROUTE, params).await?;
        handle_http_response(response).await.map_err(SwapFlowError::from)
    }
}

// -----------
// | Helpers |
// -----------

/// The ways an HTTP exchange with the router can fail
#[derive(Debug)]
enum HttpFailure {
    /// The router refused the request
    Client(StatusCode, String),
    /// The router failed to serve the request
    Server(StatusCode, String),
    /// The body could not be read or decoded
    Body(String),
}

impl From<HttpFailure> for SwapFlowError {
    fn from(e: HttpFailure) -> Self {
        match e {
            HttpFailure::Client(status, body) | HttpFailure::Server(status, body) => {
                SwapFlowError::network_transient(format!("{status}: {body}"))
            },
            HttpFailure::Body(e) => SwapFlowError::parse(e),
        }
    }
}

/// Decode a successful response body, or classify the failure
async fn handle_http_response<T: DeserializeOwned>(response: Response) -> Result<T, HttpFailure> {
    let status = response.status();
    if status.is_success() {
        let body = response.text().await.map_err(|e| HttpFailure::Body(e.to_string()))?;
        return serde_json::from_str(&body).map_err(|e| HttpFailure::Body(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    if status.is_client_error() {
        Err(HttpFailure::Client(status, body))
    } else {
        Err(HttpFailure::Server(status, body))
    }
}
