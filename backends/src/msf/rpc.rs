use std::collections::BTreeMap;

use reqwest::blocking::Client as HttpClient;
use reqwest::header::CONTENT_TYPE;
use rmpv::Value;
use tracing::debug;

use redops_common::config::MsfCredentials;
use redops_common::module::ModuleKind;
use redops_common::{Error, Result};

use super::{
    ExecutionResult, ModuleDescriptor, MsfConnector, MsfRpc, PayloadSelection, SessionId,
    SessionSummary,
};

/// Builds an [`MsfRpcClient`] from explicit login credentials.
pub struct RpcConnector;

impl MsfConnector for RpcConnector {
    type Client = MsfRpcClient;

    fn connect(&self, credentials: &MsfCredentials) -> Result<MsfRpcClient> {
        MsfRpcClient::connect(credentials)
    }
}

/// Blocking msgpack-RPC-over-HTTP client for the exploitation framework.
///
/// Requests are msgpack arrays `[method, token, args...]` posted to the
/// `/api/` endpoint; the authentication token is obtained once at connect
/// time and reused for the process lifetime.
pub struct MsfRpcClient {
    http: HttpClient,
    endpoint: String,
    token: String,
}

impl MsfRpcClient {
    pub fn connect(credentials: &MsfCredentials) -> Result<Self> {
        let scheme = if credentials.ssl { "https" } else { "http" };
        let endpoint = format!(
            "{scheme}://{}:{}/api/",
            credentials.server, credentials.port
        );
        let http = HttpClient::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| connection_error(err.to_string()))?;

        let mut client = Self {
            http,
            endpoint,
            token: String::new(),
        };
        let reply = client.call(
            "auth.login",
            vec![
                Value::from(credentials.username.as_str()),
                Value::from(credentials.password.as_str()),
            ],
        )?;
        match field_str(&reply, "token") {
            Some(token) => {
                client.token = token.to_string();
                Ok(client)
            }
            None => Err(connection_error(
                error_message(&reply).unwrap_or_else(|| "authentication rejected".to_string()),
            )),
        }
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let mut request = vec![Value::from(method)];
        if method != "auth.login" {
            request.push(Value::from(self.token.as_str()));
        }
        request.extend(args);

        let mut body = Vec::new();
        rmpv::encode::write_value(&mut body, &Value::Array(request))
            .map_err(|err| Error::Protocol(err.to_string()))?;

        debug!(target: "redops::msf", method, "rpc call");
        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "binary/message-pack")
            .body(body)
            .send()
            .map_err(|err| connection_error(err.to_string()))?;
        let bytes = response
            .bytes()
            .map_err(|err| connection_error(err.to_string()))?;
        rmpv::decode::read_value(&mut bytes.as_ref()).map_err(|err| Error::Protocol(err.to_string()))
    }

    /// Call that surfaces any backend-reported error as [`Error::Backend`].
    fn checked_call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let reply = self.call(method, args)?;
        match error_message(&reply) {
            Some(message) => Err(Error::Backend(message)),
            None => Ok(reply),
        }
    }
}

impl MsfRpc for MsfRpcClient {
    fn module_names(&mut self, kind: ModuleKind) -> Result<Vec<String>> {
        let method = match kind {
            ModuleKind::Exploit => "module.exploits",
            ModuleKind::Payload => "module.payloads",
        };
        let reply = self.checked_call(method, Vec::new())?;
        Ok(field_array(&reply, "modules"))
    }

    fn module_descriptor(&mut self, kind: ModuleKind, name: &str) -> Result<ModuleDescriptor> {
        let reply = self.call(
            "module.options",
            vec![Value::from(kind.as_str()), Value::from(name)],
        )?;
        // The backend answers module lookups on unknown names with a
        // generic rpc error; surface it as an invalid-module error.
        if error_message(&reply).is_some() {
            return Err(Error::InvalidModuleName {
                kind,
                name: name.to_string(),
            });
        }
        let mut options = BTreeMap::new();
        if let Some(map) = reply.as_map() {
            for (key, meta) in map {
                let Some(option) = value_str(key) else {
                    continue;
                };
                let value = field(meta, "default").map(display_value).unwrap_or_default();
                options.insert(option.to_string(), value);
            }
        }
        Ok(ModuleDescriptor {
            kind,
            name: name.to_string(),
            options,
        })
    }

    fn compatible_payloads(&mut self, exploit: &str) -> Result<Vec<String>> {
        let reply = self.checked_call("module.compatible_payloads", vec![Value::from(exploit)])?;
        Ok(field_array(&reply, "payloads"))
    }

    fn execute_module(
        &mut self,
        kind: ModuleKind,
        name: &str,
        options: &BTreeMap<String, String>,
        payload: Option<&PayloadSelection>,
    ) -> Result<ExecutionResult> {
        let mut merged: Vec<(Value, Value)> = options
            .iter()
            .map(|(key, value)| (Value::from(key.as_str()), Value::from(value.as_str())))
            .collect();
        if let Some(payload) = payload {
            for (key, value) in &payload.options {
                merged.push((Value::from(key.as_str()), Value::from(value.as_str())));
            }
            merged.push((Value::from("PAYLOAD"), Value::from(payload.name.as_str())));
        }

        let reply = self.call(
            "module.execute",
            vec![
                Value::from(kind.as_str()),
                Value::from(name),
                Value::Map(merged),
            ],
        )?;
        if let Some(message) = error_message(&reply) {
            if message.to_ascii_lowercase().contains("payload") {
                return Err(Error::InvalidPayload);
            }
            return Err(Error::Backend(message));
        }
        Ok(ExecutionResult {
            job_id: field(&reply, "job_id").and_then(Value::as_u64),
            uuid: field_str(&reply, "uuid").map(str::to_string),
        })
    }

    fn sessions(&mut self) -> Result<Vec<SessionSummary>> {
        let reply = self.checked_call("session.list", Vec::new())?;
        let mut sessions = Vec::new();
        if let Some(map) = reply.as_map() {
            for (id, info) in map {
                let Some(id) = id.as_u64() else {
                    continue;
                };
                sessions.push(SessionSummary {
                    id: id as SessionId,
                    session_type: field_str(info, "type").unwrap_or_default().to_string(),
                    info: field_str(info, "info").unwrap_or_default().to_string(),
                    tunnel_peer: field_str(info, "tunnel_peer").unwrap_or_default().to_string(),
                });
            }
        }
        sessions.sort_by_key(|session| session.id);
        Ok(sessions)
    }

    fn session_write(&mut self, id: SessionId, data: &str) -> Result<()> {
        let reply = self.call(
            "session.shell_write",
            vec![Value::from(id.to_string()), Value::from(data)],
        )?;
        match session_error(&reply, id) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn session_read(&mut self, id: SessionId) -> Result<String> {
        let reply = self.call("session.shell_read", vec![Value::from(id.to_string())])?;
        if let Some(err) = session_error(&reply, id) {
            return Err(err);
        }
        Ok(field_str(&reply, "data").unwrap_or_default().to_string())
    }
}

fn connection_error(reason: String) -> Error {
    Error::Connection {
        backend: "metasploit",
        reason,
    }
}

/// The backend encodes map keys as raw bytes; accept both encodings.
fn value_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => s.as_str(),
        Value::Binary(b) => std::str::from_utf8(b).ok(),
        _ => None,
    }
}

fn field<'a>(reply: &'a Value, key: &str) -> Option<&'a Value> {
    reply
        .as_map()?
        .iter()
        .find(|(k, _)| value_str(k) == Some(key))
        .map(|(_, v)| v)
}

fn field_str<'a>(reply: &'a Value, key: &str) -> Option<&'a str> {
    field(reply, key).and_then(value_str)
}

fn field_array(reply: &Value, key: &str) -> Vec<String> {
    field(reply, key)
        .and_then(Value::as_array)
        .map(|values| values.iter().filter_map(value_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn error_message(reply: &Value) -> Option<String> {
    let flagged = field(reply, "error")
        .map(|v| v.as_bool().unwrap_or(true))
        .unwrap_or(false);
    if !flagged {
        return None;
    }
    Some(
        field_str(reply, "error_message")
            .or_else(|| field_str(reply, "error_string"))
            .unwrap_or("unspecified backend error")
            .to_string(),
    )
}

fn session_error(reply: &Value, id: SessionId) -> Option<Error> {
    let message = error_message(reply)?;
    if message.to_ascii_lowercase().contains("session") {
        Some(Error::SessionNotFound(id))
    } else {
        Some(Error::Backend(message))
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Nil => String::new(),
        Value::String(s) => s.as_str().unwrap_or_default().to_string(),
        Value::Binary(b) => String::from_utf8_lossy(b).into_owned(),
        other => other.to_string(),
    }
}
