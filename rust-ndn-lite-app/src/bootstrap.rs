//! Security bootstrapping, device side.
//!
//! A device ships with a private key, the home controller's public key and
//! a shared secret. It generates a fresh key pair and asks the controller,
//! over a signed sign-on Interest, to certify it:
//!
//! ```text
//! device                                        controller
//!   | I: /ndn/sign-on/<device-id>                    |
//!   |    params: id, fresh key, capabilities,        |
//!   |            attestation by pre-installed key    |
//!   |    HMAC(shared secret)                         |
//!   |----------------------------------------------->|
//!   | D: anchor cert + device cert                   |
//!   |    HMAC(shared secret)                         |
//!   |<-----------------------------------------------|
//! ```
//!
//! The device then pins the anchor, installs its certificate, routes the
//! home prefix over the bootstrap face and runs `after_bootstrapping`.

use bytes::{Bytes, BytesMut};
use log::{debug, error, info, warn};
use rust_ndn_lite_common::{
    ndn::encode_elements,
    security::{decode_public_key, EcdsaSigner, HmacSigner, Signer, VerificationKey},
    tlv::{TlvElement, TlvReader},
    types::FaceId,
    Data, Error, Interest, Name,
};
use rust_ndn_lite_forwarder::{keys::certificate_key, Forwarder, KeyStorage, Strategy};
use serde::{Deserialize, Serialize};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{identity::DeviceIdentity, service::ServiceId};

pub const TLV_SIGN_ON_DEVICE_ID: u8 = 0x81;
pub const TLV_SIGN_ON_PUBLIC_KEY: u8 = 0x82;
pub const TLV_SIGN_ON_CAPABILITIES: u8 = 0x83;
pub const TLV_SIGN_ON_ATTESTATION: u8 = 0x84;
pub const TLV_SIGN_ON_ANCHOR_CERT: u8 = 0x85;
pub const TLV_SIGN_ON_DEVICE_CERT: u8 = 0x86;

/// Last component of the shared-secret key name.
pub const PSK_COMPONENT: &str = "psk";

/// Sign-on parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Prefix of sign-on Interests.
    pub sign_on_prefix: String,

    /// Re-sends after the first request times out.
    pub max_retries: u32,

    /// Lifetime of each sign-on Interest.
    pub request_lifetime_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            sign_on_prefix: "/ndn/sign-on".to_string(),
            max_retries: 3,
            request_lifetime_ms: 4000,
        }
    }
}

impl BootstrapConfig {
    pub fn sign_on_prefix(&self) -> Result<Name, Error> {
        self.sign_on_prefix.parse()
    }
}

/// `/<sign-on prefix>/<device-id>/KEY/psk`, the key name of a device's
/// shared secret.
pub fn psk_key_name(sign_on_prefix: &Name, device_id: &str) -> Result<Name, Error> {
    sign_on_prefix
        .append(device_id)?
        .append(rust_ndn_lite_common::security::KEY_COMPONENT)?
        .append(PSK_COMPONENT)
}

/* ---------------------------------------------------------------- *
 * Wire format
 * ---------------------------------------------------------------- */

/// ApplicationParameters of a sign-on Interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOnRequest {
    pub device_id: String,
    pub public_key: Bytes,
    pub capabilities: Vec<ServiceId>,
    pub attestation: Bytes,
}

impl SignOnRequest {
    /// What the pre-installed key signs: the fresh key followed by the
    /// device identifier.
    pub fn attested_region(public_key: &[u8], device_id: &str) -> Bytes {
        let mut region = BytesMut::with_capacity(public_key.len() + device_id.len());
        region.extend_from_slice(public_key);
        region.extend_from_slice(device_id.as_bytes());
        region.freeze()
    }

    pub fn encode(&self) -> Bytes {
        let capabilities: Vec<u8> = self.capabilities.iter().map(|s| s.0).collect();
        encode_elements(&[
            TlvElement::new(TLV_SIGN_ON_DEVICE_ID, Bytes::copy_from_slice(self.device_id.as_bytes())),
            TlvElement::new(TLV_SIGN_ON_PUBLIC_KEY, self.public_key.clone()),
            TlvElement::new(TLV_SIGN_ON_CAPABILITIES, capabilities),
            TlvElement::new(TLV_SIGN_ON_ATTESTATION, self.attestation.clone()),
        ])
    }

    pub fn decode(params: &Bytes) -> Result<Self, Error> {
        let mut reader = TlvReader::new(params.clone());
        let device_id = reader.expect(TLV_SIGN_ON_DEVICE_ID)?;
        let device_id = String::from_utf8(device_id.value.to_vec())
            .map_err(|_| Error::MalformedPacket("device identifier is not UTF-8".into()))?;
        let public_key = reader.expect(TLV_SIGN_ON_PUBLIC_KEY)?.value;
        let capabilities = reader
            .expect(TLV_SIGN_ON_CAPABILITIES)?
            .value
            .iter()
            .map(|&id| ServiceId(id))
            .collect();
        let attestation = reader.expect(TLV_SIGN_ON_ATTESTATION)?.value;
        reader.finish()?;
        Ok(Self {
            device_id,
            public_key,
            capabilities,
            attestation,
        })
    }
}

/// Content of the controller's sign-on answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignOnResponse {
    pub anchor: Data,
    pub certificate: Data,
}

impl SignOnResponse {
    pub fn encode(&self) -> Bytes {
        encode_elements(&[
            TlvElement::new(TLV_SIGN_ON_ANCHOR_CERT, self.anchor.encode()),
            TlvElement::new(TLV_SIGN_ON_DEVICE_CERT, self.certificate.encode()),
        ])
    }

    pub fn decode(content: &Bytes) -> Result<Self, Error> {
        let mut reader = TlvReader::new(content.clone());
        let anchor = Data::decode(&reader.expect(TLV_SIGN_ON_ANCHOR_CERT)?.value)?;
        let certificate = Data::decode(&reader.expect(TLV_SIGN_ON_DEVICE_CERT)?.value)?;
        reader.finish()?;
        Ok(Self { anchor, certificate })
    }
}

/* ---------------------------------------------------------------- *
 * Device side
 * ---------------------------------------------------------------- */

/// Factory-installed material of a device.
#[derive(Clone)]
pub struct BootstrapInfo {
    pub device_id: String,
    /// Raw 32-byte private key.
    pub preinstalled_key: Bytes,
    /// SEC1 public key of the home's trust anchor.
    pub anchor_public_key: Bytes,
    pub shared_secret: Bytes,
    pub capabilities: Vec<ServiceId>,
}

impl std::fmt::Debug for BootstrapInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapInfo")
            .field("device_id", &self.device_id)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// Progress of a bootstrapping run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapState {
    Pending,
    Completed,
    Failed(Error),
}

#[derive(Debug)]
struct HandleState {
    state: BootstrapState,
    identity: Option<DeviceIdentity>,
}

/// Lets the owning loop observe a bootstrapping run.
#[derive(Debug, Clone)]
pub struct BootstrapHandle {
    inner: Rc<RefCell<HandleState>>,
}

impl BootstrapHandle {
    fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(HandleState {
                state: BootstrapState::Pending,
                identity: None,
            })),
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.inner.borrow().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.borrow().state == BootstrapState::Pending
    }

    /// The certified identity, once bootstrapping completed.
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.inner.borrow().identity.clone()
    }

    fn complete(&self, identity: DeviceIdentity) {
        let mut inner = self.inner.borrow_mut();
        inner.state = BootstrapState::Completed;
        inner.identity = Some(identity);
    }

    fn fail(&self, error: Error) {
        self.inner.borrow_mut().state = BootstrapState::Failed(error);
    }
}

type AfterBootstrapping = Box<dyn FnOnce(&mut Forwarder, &DeviceIdentity)>;

struct Session {
    config: BootstrapConfig,
    info: BootstrapInfo,
    face: FaceId,
    fresh: EcdsaSigner,
    psk: HmacSigner,
    request: Interest,
    attempts: Cell<u32>,
    handle: BootstrapHandle,
    after: RefCell<Option<AfterBootstrapping>>,
}

/// Drives the device side of the sign-on exchange.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    config: BootstrapConfig,
    info: BootstrapInfo,
}

impl Bootstrapper {
    pub fn new(config: BootstrapConfig, info: BootstrapInfo) -> Self {
        Self { config, info }
    }

    /// Send the sign-on request on `face`. `after_bootstrapping` runs once,
    /// inside a later processing pass, if the controller certifies the
    /// device.
    pub fn start(
        self,
        fwd: &mut Forwarder,
        face: FaceId,
        after_bootstrapping: impl FnOnce(&mut Forwarder, &DeviceIdentity) + 'static,
    ) -> Result<BootstrapHandle, Error> {
        let prefix = self.config.sign_on_prefix()?;
        let preinstalled = EcdsaSigner::from_private_bytes(&prefix, &self.info.preinstalled_key)?;
        decode_public_key(&self.info.anchor_public_key)?;
        let fresh = EcdsaSigner::generate(&prefix)?;

        let psk = HmacSigner::new(
            psk_key_name(&prefix, &self.info.device_id)?,
            self.info.shared_secret.clone(),
        );
        let public_key = fresh.public_key_bytes();
        let attestation = preinstalled.sign(&SignOnRequest::attested_region(&public_key, &self.info.device_id))?;
        let params = SignOnRequest {
            device_id: self.info.device_id.clone(),
            public_key,
            capabilities: self.info.capabilities.clone(),
            attestation,
        }
        .encode();
        let mut request = Interest::new(prefix.append(self.info.device_id.as_str())?)
            .with_lifetime(self.config.request_lifetime_ms)
            .with_parameters(params);
        request.sign(&psk)?;

        // The answer is HMAC-signed and must pass the forwarder's checks.
        fwd.keys_mut().add_key(psk.key_name().clone(), psk.verification_key());
        fwd.add_route(&prefix, face)?;

        let handle = BootstrapHandle::new();
        let session = Rc::new(Session {
            config: self.config,
            info: self.info,
            face,
            fresh,
            psk,
            request,
            attempts: Cell::new(0),
            handle: handle.clone(),
            after: RefCell::new(Some(Box::new(after_bootstrapping))),
        });
        info!("Bootstrapping {} via face {}", session.info.device_id, face.0);
        send_request(fwd, session)?;
        Ok(handle)
    }
}

fn send_request(fwd: &mut Forwarder, session: Rc<Session>) -> Result<(), Error> {
    let attempt = session.attempts.get() + 1;
    session.attempts.set(attempt);
    let mut request = session.request.clone();
    request.refresh_nonce();
    debug!("Sign-on attempt {} for {}", attempt, request.name);

    let on_data = Rc::clone(&session);
    let on_timeout = Rc::clone(&session);
    fwd.express_interest(
        request,
        move |fwd, data| match finish(fwd, &on_data, data) {
            Ok(()) => {}
            Err(e) => fail(&on_data, e),
        },
        move |fwd, interest| {
            if on_timeout.attempts.get() > on_timeout.config.max_retries {
                fail(
                    &on_timeout,
                    Error::BootstrappingFailure(format!(
                        "no answer to {} after {} attempts",
                        interest.name,
                        on_timeout.attempts.get()
                    )),
                );
                return;
            }
            warn!("Sign-on request {} timed out, retrying", interest.name);
            if let Err(e) = send_request(fwd, Rc::clone(&on_timeout)) {
                fail(&on_timeout, e);
            }
        },
    )?;
    Ok(())
}

fn fail(session: &Session, error: Error) {
    let error = match error {
        e @ Error::BootstrappingFailure(_) => e,
        other => Error::BootstrappingFailure(other.to_string()),
    };
    error!("Bootstrapping {} failed: {}", session.info.device_id, error);
    session.handle.fail(error);
}

/// Check the controller's answer and install the resulting identity.
fn finish(fwd: &mut Forwarder, session: &Session, data: &Data) -> Result<(), Error> {
    if data.signature.info.key_locator.as_ref() != Some(session.psk.key_name())
        || !data.verify_with(&session.psk.verification_key())
    {
        return Err(Error::VerificationFailure(format!("{} is not signed with the shared secret", data.name)));
    }
    let response = SignOnResponse::decode(&data.content)?;

    let pinned = VerificationKey::Ecdsa(decode_public_key(&session.info.anchor_public_key)?);
    if certificate_key(&response.anchor)? != pinned {
        return Err(Error::VerificationFailure(format!(
            "anchor {} does not match the pre-shared key",
            response.anchor.name
        )));
    }

    // Check the chain on a scratch store before touching the forwarder.
    let mut scratch = KeyStorage::new();
    scratch.set_trust_anchor(response.anchor.clone())?;
    let bound = scratch.verify_certificate(&response.certificate)?;
    if bound != session.fresh.verification_key() {
        return Err(Error::VerificationFailure(format!(
            "certificate {} binds another key",
            response.certificate.name
        )));
    }
    let identity = DeviceIdentity::new(
        session.info.device_id.clone(),
        session.fresh.clone(),
        response.certificate.clone(),
        response.anchor.clone(),
    )?;

    let keys = fwd.keys_mut();
    keys.set_trust_anchor(response.anchor)?;
    keys.install_certificate(identity.certificate())?;

    let cert = identity.certificate().clone();
    let cert_prefix = identity.identity_name()?.append(rust_ndn_lite_common::security::KEY_COMPONENT)?;
    fwd.register_prefix(&cert_prefix, move |fwd: &mut Forwarder, _: &Interest| {
        fwd.put_data(&cert);
        Strategy::Suppress
    })?;
    fwd.add_route(identity.home_prefix(), session.face)?;

    info!("Bootstrapped as {}", identity.certificate().name);
    session.handle.complete(identity.clone());
    if let Some(after) = session.after.borrow_mut().take() {
        after(fwd, &identity);
    }
    Ok(())
}
