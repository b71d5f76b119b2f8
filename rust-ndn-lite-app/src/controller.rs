//! Security bootstrapping, controller side.
//!
//! The controller owns the home's trust anchor. It answers sign-on
//! Interests from registered devices with the anchor certificate and a
//! freshly issued device certificate.

use bytes::Bytes;
use log::{debug, info, warn};
use rust_ndn_lite_common::{
    security::{decode_public_key, EcdsaSigner, HmacSigner, VerificationKey},
    types::HandlerId,
    Data, Error, Interest, Name,
};
use rust_ndn_lite_forwarder::{Forwarder, Strategy};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{
    bootstrap::{psk_key_name, BootstrapConfig, SignOnRequest, SignOnResponse},
    identity::{issue_certificate, DeviceIdentity},
    service::ServiceId,
};

/// What the controller knows about one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device_id: String,
    /// SEC1 public key matching the factory-installed private key.
    pub preinstalled_key: Bytes,
    pub shared_secret: Bytes,
    /// Reported during sign-on.
    pub capabilities: Vec<ServiceId>,
    /// Last certificate issued to the device.
    pub certificate: Option<Data>,
}

#[derive(Debug)]
struct ControllerState {
    identity: DeviceIdentity,
    sign_on_prefix: Name,
    devices: HashMap<String, DeviceRecord>,
}

/// Home controller answering sign-on requests.
#[derive(Debug, Clone)]
pub struct BootstrapController {
    inner: Rc<RefCell<ControllerState>>,
}

impl BootstrapController {
    /// Controller with a freshly generated anchor for `home_prefix`.
    pub fn new(home_prefix: &Name, config: &BootstrapConfig) -> Result<Self, Error> {
        Self::with_anchor(EcdsaSigner::generate(home_prefix)?, config)
    }

    /// Controller whose anchor key is `anchor`; the home prefix is the
    /// signer's identity.
    pub fn with_anchor(anchor: EcdsaSigner, config: &BootstrapConfig) -> Result<Self, Error> {
        Ok(Self {
            inner: Rc::new(RefCell::new(ControllerState {
                identity: DeviceIdentity::anchor(anchor)?,
                sign_on_prefix: config.sign_on_prefix()?,
                devices: HashMap::new(),
            })),
        })
    }

    /// The anchor identity, usable for signing commands.
    pub fn identity(&self) -> DeviceIdentity {
        self.inner.borrow().identity.clone()
    }

    /// The key devices must pin.
    pub fn anchor_public_key(&self) -> Bytes {
        self.inner.borrow().identity.public_key()
    }

    pub fn register_device(&self, device_id: impl Into<String>, preinstalled_key: Bytes, shared_secret: Bytes) {
        let device_id = device_id.into();
        debug!("Controller: registered device {}", device_id);
        self.inner.borrow_mut().devices.insert(
            device_id.clone(),
            DeviceRecord {
                device_id,
                preinstalled_key,
                shared_secret,
                capabilities: Vec::new(),
                certificate: None,
            },
        );
    }

    pub fn device(&self, device_id: &str) -> Option<DeviceRecord> {
        self.inner.borrow().devices.get(device_id).cloned()
    }

    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.inner.borrow().devices.values().cloned().collect()
    }

    /// Trust the anchor on `fwd` and start answering sign-on Interests.
    pub fn start(&self, fwd: &mut Forwarder) -> Result<HandlerId, Error> {
        let (anchor, prefix) = {
            let state = self.inner.borrow();
            (state.identity.anchor_certificate().clone(), state.sign_on_prefix.clone())
        };
        fwd.keys_mut().set_trust_anchor(anchor)?;

        let controller = self.clone();
        let id = fwd.register_prefix(&prefix, move |fwd: &mut Forwarder, interest: &Interest| {
            match controller.answer(interest) {
                Ok(data) => {
                    fwd.put_data(&data);
                }
                Err(e) => warn!("Controller: rejected {}: {}", interest.name, e),
            }
            Strategy::Suppress
        })?;
        info!("Controller: answering sign-on requests under {}", prefix);
        Ok(id)
    }

    /// Check one sign-on request and build the answer.
    pub fn answer(&self, interest: &Interest) -> Result<Data, Error> {
        let mut state = self.inner.borrow_mut();
        let device_id = interest
            .name
            .get(state.sign_on_prefix.len())
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::InvalidName(format!("{} carries no device identifier", interest.name)))?
            .to_string();
        let record = state
            .devices
            .get(&device_id)
            .ok_or_else(|| Error::BootstrappingFailure(format!("unknown device {}", device_id)))?;

        if !interest.verify(&VerificationKey::Hmac(record.shared_secret.clone())) {
            return Err(Error::VerificationFailure("bad sign-on signature".into()));
        }
        let params = interest
            .parameters
            .as_ref()
            .ok_or_else(|| Error::MalformedPacket("sign-on request without parameters".into()))?;
        let request = SignOnRequest::decode(params)?;
        if request.device_id != device_id {
            return Err(Error::VerificationFailure(format!(
                "request for {} names {}",
                device_id, request.device_id
            )));
        }

        let factory = VerificationKey::Ecdsa(decode_public_key(&record.preinstalled_key)?);
        let region = SignOnRequest::attested_region(&request.public_key, &request.device_id);
        if !factory.verify(&region, &request.attestation) {
            return Err(Error::VerificationFailure(format!("bad attestation from {}", device_id)));
        }
        decode_public_key(&request.public_key)?;

        let subject = state.identity.home_prefix().append(device_id.as_str())?;
        let certificate = issue_certificate(state.identity.signer(), &subject, &request.public_key)?;
        let response = SignOnResponse {
            anchor: state.identity.anchor_certificate().clone(),
            certificate: certificate.clone(),
        };
        let psk = HmacSigner::new(
            psk_key_name(&state.sign_on_prefix, &device_id)?,
            record.shared_secret.clone(),
        );
        let mut data = Data::new(interest.name.clone(), response.encode());
        data.sign(&psk)?;

        info!("Controller: issued {}", certificate.name);
        if let Some(record) = state.devices.get_mut(&device_id) {
            record.capabilities = request.capabilities;
            record.certificate = Some(certificate);
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_ndn_lite_common::security::Signer;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    fn request(factory: &EcdsaSigner, device_id: &str, secret: &'static [u8]) -> Interest {
        let fresh = EcdsaSigner::generate(&name("/tmp")).unwrap();
        let public_key = fresh.public_key_bytes();
        let attestation = factory
            .sign(&SignOnRequest::attested_region(&public_key, device_id))
            .unwrap();
        let params = SignOnRequest {
            device_id: device_id.into(),
            public_key,
            capabilities: vec![ServiceId::LOCK],
            attestation,
        }
        .encode();
        let prefix = name("/ndn/sign-on");
        let mut interest = Interest::new(prefix.append(device_id).unwrap()).with_parameters(params);
        interest
            .sign(&HmacSigner::new(psk_key_name(&prefix, device_id).unwrap(), secret))
            .unwrap();
        interest
    }

    #[test]
    fn test_answer_issues_certificate() {
        let ctrl = BootstrapController::new(&name("/home"), &BootstrapConfig::default()).unwrap();
        let factory = EcdsaSigner::generate(&name("/factory")).unwrap();
        ctrl.register_device("lock", factory.public_key_bytes(), Bytes::from_static(b"secret"));

        let data = ctrl.answer(&request(&factory, "lock", b"secret")).unwrap();
        let response = SignOnResponse::decode(&data.content).unwrap();
        assert_eq!(response.anchor, *ctrl.identity().anchor_certificate());
        assert!(name("/home/lock/KEY").is_prefix_of(&response.certificate.name));
        assert_eq!(ctrl.device("lock").unwrap().capabilities, vec![ServiceId::LOCK]);
    }

    #[test]
    fn test_answer_rejects_bad_requests() {
        let ctrl = BootstrapController::new(&name("/home"), &BootstrapConfig::default()).unwrap();
        let factory = EcdsaSigner::generate(&name("/factory")).unwrap();
        let impostor = EcdsaSigner::generate(&name("/factory")).unwrap();
        ctrl.register_device("lock", factory.public_key_bytes(), Bytes::from_static(b"secret"));

        assert!(matches!(
            ctrl.answer(&request(&factory, "lock", b"wrong")),
            Err(Error::VerificationFailure(_))
        ));
        assert!(matches!(
            ctrl.answer(&request(&impostor, "lock", b"secret")),
            Err(Error::VerificationFailure(_))
        ));
        assert!(matches!(
            ctrl.answer(&request(&factory, "unknown", b"secret")),
            Err(Error::BootstrappingFailure(_))
        ));
        assert!(ctrl.device("lock").unwrap().certificate.is_none());
    }
}
