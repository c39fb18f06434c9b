//! Access gate
//!
//! Ties network recognition, policy merging and evaluation together for a
//! single request, and holds the currently loaded policies.
//!
//! Policies are never mutated in place. A reload compiles a complete new
//! [`GateState`] and swaps it in; evaluations already running keep the
//! snapshot they started with.

use crate::access_control::{
    AccessDecision, Authorizer, EvaluationMode, Policy, Resource, Subject, merge,
};
use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::network::NetworkRecognizer;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// A request to decide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    pub resource: Resource,
    pub subject: Subject,
    /// Source address of the caller, when known
    pub client_ip: Option<IpAddr>,
}

impl AccessRequest {
    pub fn new(resource: Resource, subject: Subject) -> Self {
        Self {
            resource,
            subject,
            client_ip: None,
        }
    }

    pub fn with_client_ip(mut self, ip: IpAddr) -> Self {
        self.client_ip = Some(ip);
        self
    }
}

/// Result of a gate evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessOutcome {
    pub allowed: bool,
    /// User recognized from the source address, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognized_user: Option<String>,
}

/// Compiled policies and network bindings
#[derive(Debug, Clone, Default)]
pub struct GateState {
    access_control: Option<Policy>,
    network_access_control: Option<Policy>,
    /// `access_control` merged with `network_access_control`
    recognized: Option<Policy>,
    recognizer: NetworkRecognizer,
}

impl GateState {
    pub fn new(
        access_control: Option<Policy>,
        network_access_control: Option<Policy>,
        recognizer: NetworkRecognizer,
    ) -> Self {
        // Without a primary policy access is unrestricted, recognized or not
        let recognized = match (&access_control, &network_access_control) {
            (Some(primary), Some(secondary)) => Some(merge(primary, secondary)),
            (primary, _) => primary.clone(),
        };

        Self {
            access_control,
            network_access_control,
            recognized,
            recognizer,
        }
    }

    /// Compile every policy of a configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let access_control = config
            .access_control
            .as_ref()
            .map(|acl| Policy::compile_section(acl, "access_control"))
            .transpose()?;
        let network_access_control = config
            .network_access_control
            .as_ref()
            .map(|acl| Policy::compile_section(acl, "network_access_control"))
            .transpose()?;
        let recognizer = NetworkRecognizer::from_config(&config.network_binding)?;

        if access_control.is_none() {
            warn!("No access_control configured, every request will be granted");
        }
        if network_access_control.is_some() && recognizer.is_empty() {
            warn!("network_access_control is configured but no network_binding is defined");
        }

        Ok(Self::new(access_control, network_access_control, recognizer))
    }

    pub fn access_control(&self) -> Option<&Policy> {
        self.access_control.as_ref()
    }

    pub fn network_access_control(&self) -> Option<&Policy> {
        self.network_access_control.as_ref()
    }

    /// Policy applied to callers recognized by network
    pub fn recognized_policy(&self) -> Option<&Policy> {
        self.recognized.as_ref()
    }

    pub fn recognizer(&self) -> &NetworkRecognizer {
        &self.recognizer
    }

    /// Decide a request
    pub fn evaluate(&self, request: &AccessRequest) -> AccessOutcome {
        let (outcome, _) = self.evaluate_detailed(request);
        outcome
    }

    /// Decide a request, also reporting what decided it
    pub fn evaluate_detailed(&self, request: &AccessRequest) -> (AccessOutcome, AccessDecision) {
        let recognized_user = request
            .client_ip
            .and_then(|ip| self.recognizer.recognize(ip))
            .map(str::to_string);

        let decision = match &recognized_user {
            Some(user) => {
                // An authenticated identity is kept; otherwise the network
                // identity stands in for it
                let subject = if request.subject.is_authenticated() {
                    request.subject.clone()
                } else {
                    Subject {
                        user: user.clone(),
                        ..request.subject.clone()
                    }
                };
                debug!(user = %subject.user, "Caller recognized by network");

                Authorizer::new(self.recognized.as_ref())
                    .with_mode(EvaluationMode::Recognized)
                    .check(&request.resource, &subject)
            }
            None => Authorizer::new(self.access_control.as_ref())
                .check(&request.resource, &request.subject),
        };

        let outcome = AccessOutcome {
            allowed: decision.is_allowed(),
            recognized_user,
        };
        (outcome, decision)
    }
}

/// Holds the current [`GateState`] and swaps it atomically on reload
#[derive(Debug, Default)]
pub struct AccessGate {
    state: RwLock<Arc<GateState>>,
}

impl AccessGate {
    pub fn new(state: GateState) -> Self {
        Self {
            state: RwLock::new(Arc::new(state)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(GateState::from_config(config)?))
    }

    // Lock helpers recover from poisoning; the guarded value is a plain Arc
    // swap and cannot be left half-written

    fn read_state(&self) -> RwLockReadGuard<'_, Arc<GateState>> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("gate state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Arc<GateState>> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("gate state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Current state; stays valid after a reload
    pub fn snapshot(&self) -> Arc<GateState> {
        Arc::clone(&self.read_state())
    }

    /// Replace the current state
    pub fn install(&self, state: GateState) {
        *self.write_state() = Arc::new(state);
    }

    /// Compile a configuration and install it
    ///
    /// The current state is kept when compilation fails.
    pub fn reload(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let state = GateState::from_config(config)?;
        let rules = state.access_control().map_or(0, Policy::rule_count);
        self.install(state);
        info!(rules, "Access control reloaded");
        Ok(())
    }

    /// Decide a request against the current state
    pub fn evaluate(&self, request: &AccessRequest) -> AccessOutcome {
        self.snapshot().evaluate(request)
    }
}
