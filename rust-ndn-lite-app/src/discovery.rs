//! Service discovery responder.
//!
//! Devices advertise the services they provide. Once bootstrapped, a
//! suppress-strategy producer on `/<home>/SD/<device-id>` answers with the
//! current list, signed by the device key.

use bytes::Bytes;
use log::{debug, info};
use rust_ndn_lite_common::{
    ndn::encode_elements,
    tlv::{TlvElement, TlvReader},
    types::HandlerId,
    Data, Error, Interest, Name,
};
use rust_ndn_lite_forwarder::{Forwarder, Strategy};
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, rc::Rc};

use crate::{identity::DeviceIdentity, service::ServiceId};

pub const DISCOVERY_COMPONENT: &str = "SD";

/// One entry of the service list.
pub const TLV_SD_SERVICE: u8 = 0x87;

/// Freshness of service lists.
pub const SERVICE_LIST_FRESHNESS_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfService {
    pub service: ServiceId,
    pub is_up: bool,
    /// Application-defined; 1 means normal operation.
    pub state_code: u8,
}

impl SelfService {
    fn to_tlv(self) -> TlvElement {
        TlvElement::new(TLV_SD_SERVICE, vec![self.service.0, self.is_up as u8, self.state_code])
    }

    fn from_tlv(element: &TlvElement) -> Result<Self, Error> {
        match element.value.as_ref() {
            [service, is_up, state_code] => Ok(Self {
                service: ServiceId(*service),
                is_up: *is_up != 0,
                state_code: *state_code,
            }),
            _ => Err(Error::MalformedPacket("bad service entry".into())),
        }
    }
}

/// Services this device provides. Clones share the list.
#[derive(Debug, Clone, Default)]
pub struct ServiceDiscovery {
    services: Rc<RefCell<Vec<SelfService>>>,
}

impl ServiceDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update the entry for `service`.
    pub fn add_or_update_self_service(&self, service: ServiceId, is_up: bool, state_code: u8) {
        let mut services = self.services.borrow_mut();
        let entry = SelfService {
            service,
            is_up,
            state_code,
        };
        match services.iter_mut().find(|s| s.service == service) {
            Some(existing) => *existing = entry,
            None => services.push(entry),
        }
        debug!("Service discovery: {} up={} state={}", service, is_up, state_code);
    }

    pub fn services(&self) -> Vec<SelfService> {
        self.services.borrow().clone()
    }

    /// `/<home>/SD/<device-id>`
    pub fn responder_name(identity: &DeviceIdentity) -> Result<Name, Error> {
        identity
            .home_prefix()
            .append(DISCOVERY_COMPONENT)?
            .append(identity.device_id())
    }

    /// Answer discovery Interests for `identity`.
    pub fn start(&self, fwd: &mut Forwarder, identity: DeviceIdentity) -> Result<HandlerId, Error> {
        let prefix = Self::responder_name(&identity)?;
        let services = Rc::clone(&self.services);
        let id = fwd.register_prefix(&prefix, move |fwd: &mut Forwarder, interest: &Interest| {
            let content = encode_service_list(&services.borrow());
            let mut data = Data::new(interest.name.clone(), content).with_freshness(SERVICE_LIST_FRESHNESS_MS);
            match data.sign(identity.signer()) {
                Ok(_) => {
                    fwd.put_data(&data);
                }
                Err(e) => debug!("Service discovery: cannot sign answer: {}", e),
            }
            Strategy::Suppress
        })?;
        info!("Service discovery answering on {}", prefix);
        Ok(id)
    }
}

pub fn encode_service_list(services: &[SelfService]) -> Bytes {
    let elements: Vec<TlvElement> = services.iter().map(|s| s.to_tlv()).collect();
    encode_elements(&elements)
}

pub fn decode_service_list(content: &Bytes) -> Result<Vec<SelfService>, Error> {
    let mut reader = TlvReader::new(content.clone());
    let mut services = Vec::new();
    while !reader.is_empty() {
        services.push(SelfService::from_tlv(&reader.expect(TLV_SD_SERVICE)?)?);
    }
    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::DeviceIdentity;
    use rust_ndn_lite_common::security::EcdsaSigner;
    use rust_ndn_lite_forwarder::{ForwarderConfig, ManualClock};

    #[test]
    fn test_add_or_update() {
        let sd = ServiceDiscovery::new();
        sd.add_or_update_self_service(ServiceId::LED, true, 1);
        sd.add_or_update_self_service(ServiceId::TEMP, true, 1);
        sd.add_or_update_self_service(ServiceId::LED, false, 3);

        let services = sd.services();
        assert_eq!(services.len(), 2);
        assert_eq!(
            services[0],
            SelfService {
                service: ServiceId::LED,
                is_up: false,
                state_code: 3
            }
        );
    }

    #[test]
    fn test_responder_serves_current_list() {
        let identity = DeviceIdentity::anchor(EcdsaSigner::generate(&"/home".parse().unwrap()).unwrap()).unwrap();
        let mut fwd = Forwarder::with_clock(ForwarderConfig::default(), ManualClock::new());
        let sd = ServiceDiscovery::new();
        sd.add_or_update_self_service(ServiceId::LED, true, 1);
        sd.start(&mut fwd, identity.clone()).unwrap();
        // Updates after start are visible to later queries.
        sd.add_or_update_self_service(ServiceId::LOCK, true, 1);

        let got = Rc::new(RefCell::new(None));
        let g = Rc::clone(&got);
        let name = ServiceDiscovery::responder_name(&identity).unwrap();
        fwd.express_interest(
            Interest::new(name),
            move |_, data| *g.borrow_mut() = Some(decode_service_list(&data.content).unwrap()),
            |_, _| {},
        )
        .unwrap();

        let services = got.borrow_mut().take().unwrap();
        assert_eq!(
            services.iter().map(|s| s.service).collect::<Vec<_>>(),
            vec![ServiceId::LED, ServiceId::LOCK]
        );
    }
}
