use mask_painter::{
    BoxFuture, GatewayError, ProcessRequest, ProcessResponse, ProcessingGateway, spawn_blocking,
};

/// Posts requests as JSON to the inpainting endpoint. Each request runs on its own thread.
pub struct HttpGateway {
    endpoint: String,
    agent: ureq::Agent,
}

impl HttpGateway {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ProcessingGateway for HttpGateway {
    fn process(&self, request: ProcessRequest) -> BoxFuture<'static, Result<String, GatewayError>> {
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        spawn_blocking(move || post(&agent, &endpoint, &request))
    }
}

fn post(
    agent: &ureq::Agent,
    endpoint: &str,
    request: &ProcessRequest,
) -> Result<String, GatewayError> {
    let payload =
        serde_json::to_string(request).map_err(|e| GatewayError::Transport(e.to_string()))?;
    log::debug!("POST {endpoint} ({} bytes)", payload.len());
    let response = agent
        .post(endpoint)
        .set("Content-Type", "application/json")
        .set("Accept", "application/json")
        .send_string(&payload);
    // Error statuses still carry a JSON body with the reason
    let (status, body) = match response {
        Ok(resp) => (resp.status(), resp.into_string()),
        Err(ureq::Error::Status(code, resp)) => (code, resp.into_string()),
        Err(e) => return Err(GatewayError::Transport(e.to_string())),
    };
    let body = body.map_err(|e| GatewayError::Transport(e.to_string()))?;
    match serde_json::from_str::<ProcessResponse>(&body) {
        Ok(parsed) => parsed.into_output(),
        Err(e) => {
            log::warn!("Unreadable answer with status {status}: {e}");
            Err(GatewayError::Transport(format!("HTTP {status}: unexpected response")))
        }
    }
}
