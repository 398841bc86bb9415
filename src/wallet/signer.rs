//! Signed external messages for a v4r2 wallet contract.
//!
//! Signing payload layout:
//!
//! ```text
//! subwallet_id:u32 valid_until:u32 seqno:u32 op:u8=0 (mode:u8 ^internal_message){1,4}
//! ```
//!
//! The signed body is the 512-bit signature of that cell's hash followed by
//! the cell's own bits and references.
//!
//! The wallet address is the hash of its state init: the v4r2 code plus a data
//! cell holding `seqno:u32=0 subwallet_id:u32 public_key:bits256 plugins:(HashmapE 256 int8)`.
//! The first external message sent to an undeployed wallet carries that state init.

use std::fmt;
use std::sync::Arc;

use ed25519_dalek::{Signer, SigningKey};

use super::{OutgoingMessage, WalletError};
use crate::address::TonAddress;
use crate::cell::{Cell, CellBuilder, CellResult, deserialize_boc_base64};

pub const DEFAULT_SUBWALLET_ID: u32 = 698_983_191;
pub const MAX_MESSAGES: usize = 4;

const OP_SIMPLE_SEND: u8 = 0;

const WALLET_V4R2_CODE: &str = "te6cckECFAEAAtQAART/APSkE/S88sgLAQIBIAIDAgFIBAUE+PKDCNcYINMf0x/THwL4I7vyZO1E0NMf0x/T//QE0VFDuvKhUVG68qIF+QFUEGT5EPKj+AAkpMjLH1JAyx9SMMv/UhD0AMntVPgPAdMHIcAAn2xRkyDXSpbTB9QC+wDoMOAhwAHjACHAAuMAAcADkTDjDQOkyMsfEssfy/8QERITAubQAdDTAyFxsJJfBOAi10nBIJJfBOAC0x8hghBwbHVnvSKCEGRzdHK9sJJfBeAD+kAwIPpEAcjKB8v/ydDtRNCBAUDXIfQEMFyBAQj0Cm+hMbOSXwfgBdM/yCWCEHBsdWe6kjgw4w0DghBkc3RyupJfBuMNBgcCASAICQB4AfoA9AQw+CdvIjBQCqEhvvLgUIIQcGx1Z4MesXCAGFAEywUmzxZY+gIZ9ADLaRfLH1Jgyz8gyYBA+wAGAIpQBIEBCPRZMO1E0IEBQNcgyAHPFvQAye1UAXKwjiOCEGRzdHKDHrFwgBhQBcsFUAPPFiP6AhPLassfyz/JgED7AJJfA+ICASAKCwBZvSQrb2omhAgKBrkPoCGEcNQICEekk30pkQzmkD6f+YN4EoAbeBAUiYcVnzGEAgFYDA0AEbjJftRNDXCx+AA9sp37UTQgQFA1yH0BDACyMoHy//J0AGBAQj0Cm+hMYAIBIA4PABmtznaiaEAga5Drhf/AABmvHfaiaEAQa5DrhY/AAG7SB/oA1NQi+QAFyMoHFcv/ydB3dIAYyMsFywIizxZQBfoCFMtrEszMyXP7AMhAFIEBCPRR8qcCAHCBAQjXGPoA0z/IVCBHgQEI9FHyp4IQbm90ZXB0gBjIywXLAlAGzxZQBPoCFMtqEssfyz/Jc/sAAgBsgQEI1xj6ANM/MFIkgQEI9Fnyp4IQZHN0cnB0gBjIywXLAlAFzxZQA/oCE8tqyx8Syz/Jc/sAAAr0AMntVGliJeU=";

/// Address of the v4r2 wallet controlled by `public_key` on `workchain`.
pub fn derive_address(public_key: &[u8; 32], workchain: i8) -> Result<TonAddress, WalletError> {
    let state_init = build_state_init(public_key, subwallet_for(workchain))?;
    Ok(TonAddress::new(workchain, state_init.hash()))
}

fn subwallet_for(workchain: i8) -> u32 {
    DEFAULT_SUBWALLET_ID.wrapping_add(workchain as i32 as u32)
}

pub struct V4R2Signer {
    signing_key: SigningKey,
    address: TonAddress,
    subwallet_id: u32,
}

impl V4R2Signer {
    pub fn new(signing_key: SigningKey, address: TonAddress) -> Self {
        Self {
            signing_key,
            subwallet_id: subwallet_for(address.workchain()),
            address,
        }
    }

    /// Signer for the wallet whose address is derived from `signing_key`.
    pub fn from_key(signing_key: SigningKey, workchain: i8) -> Result<Self, WalletError> {
        let address = derive_address(&signing_key.verifying_key().to_bytes(), workchain)?;
        Ok(Self::new(signing_key, address))
    }

    pub fn address(&self) -> &TonAddress {
        &self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn subwallet_id(&self) -> u32 {
        self.subwallet_id
    }

    pub fn state_init(&self) -> Result<Cell, WalletError> {
        build_state_init(&self.public_key(), self.subwallet_id)
    }

    pub fn create_transfer_body(
        &self,
        seqno: u32,
        valid_until: u32,
        messages: &[OutgoingMessage],
    ) -> Result<Cell, WalletError> {
        if messages.is_empty() || messages.len() > MAX_MESSAGES {
            return Err(WalletError::InvalidMessageCount(messages.len()));
        }

        let mut builder = CellBuilder::new();
        builder.store_u32(self.subwallet_id)?;
        builder.store_u32(valid_until)?;
        builder.store_u32(seqno)?;
        builder.store_u8(OP_SIMPLE_SEND)?;

        for message in messages {
            builder.store_u8(message.mode)?;
            builder.store_ref(Arc::new(build_internal_message(message)?))?;
        }

        Ok(builder.build()?)
    }

    pub fn sign(&self, body: &Cell) -> Result<Cell, WalletError> {
        let signature = self.signing_key.sign(&body.hash());

        let mut builder = CellBuilder::new();
        builder.store_bytes(&signature.to_bytes())?;
        builder.store_cell_contents(body)?;
        Ok(builder.build()?)
    }

    /// Wraps a signed body into `ext_in_msg_info$10` addressed to this wallet,
    /// with the state init in a reference when one is given.
    pub fn create_external_message(&self, signed_body: Cell, state_init: Option<Cell>) -> Result<Cell, WalletError> {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b10, 2)?;
        builder.store_null_address()?;
        builder.store_address(&self.address)?;
        builder.store_coins(0)?;
        match state_init {
            Some(init) => {
                builder.store_bit(true)?;
                builder.store_bit(true)?;
                builder.store_ref(Arc::new(init))?;
            },
            None => {
                builder.store_bit(false)?;
            },
        }
        builder.store_bit(true)?;
        builder.store_ref(Arc::new(signed_body))?;
        Ok(builder.build()?)
    }

    /// `deploy` attaches the state init, for a wallet that is not yet active.
    pub fn build_signed_transfer(
        &self,
        seqno: u32,
        valid_until: u32,
        messages: &[OutgoingMessage],
        deploy: bool,
    ) -> Result<Cell, WalletError> {
        let body = self.create_transfer_body(seqno, valid_until, messages)?;
        let signed = self.sign(&body)?;
        let state_init = if deploy { Some(self.state_init()?) } else { None };
        self.create_external_message(signed, state_init)
    }
}

impl fmt::Debug for V4R2Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("V4R2Signer")
            .field("address", &self.address.to_raw_string())
            .field("public_key", &hex::encode(self.public_key()))
            .field("subwallet_id", &self.subwallet_id)
            .finish_non_exhaustive()
    }
}

/// `_ split_depth:(Maybe) special:(Maybe) code:(Maybe ^Cell) data:(Maybe ^Cell) library:(Maybe)`
fn build_state_init(public_key: &[u8; 32], subwallet_id: u32) -> Result<Cell, WalletError> {
    let code = deserialize_boc_base64(WALLET_V4R2_CODE)?;

    let mut data = CellBuilder::new();
    data.store_u32(0)?;
    data.store_u32(subwallet_id)?;
    data.store_bytes(public_key)?;
    data.store_bit(false)?;
    let data = data.build()?;

    let mut builder = CellBuilder::new();
    builder.store_bit(false)?;
    builder.store_bit(false)?;
    builder.store_bit(true)?;
    builder.store_ref(code)?;
    builder.store_bit(true)?;
    builder.store_ref(Arc::new(data))?;
    builder.store_bit(false)?;
    Ok(builder.build()?)
}

/// `int_msg_info$0` with IHR disabled, no state init and the body in a reference.
fn build_internal_message(message: &OutgoingMessage) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_bit(false)?;
    builder.store_bit(true)?;
    builder.store_bit(message.bounce)?;
    builder.store_bit(false)?;
    builder.store_null_address()?;
    builder.store_address(&message.destination)?;
    builder.store_coins(message.amount as u128)?;
    // empty extra currencies, ihr_fee, fwd_fee, created_lt, created_at
    builder.store_bit(false)?;
    builder.store_coins(0)?;
    builder.store_coins(0)?;
    builder.store_u64(0)?;
    builder.store_u32(0)?;
    // no state init
    builder.store_bit(false)?;
    builder.store_bit(true)?;
    builder.store_ref(message.body.clone())?;
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    const SOURCE: &str = "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8";

    fn signer() -> V4R2Signer {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        V4R2Signer::new(key, TonAddress::parse(SOURCE).unwrap())
    }

    fn message(amount: u64) -> OutgoingMessage {
        OutgoingMessage {
            destination: TonAddress::parse(&format!("0:{}", "11".repeat(32))).unwrap(),
            amount,
            bounce: false,
            mode: 1,
            body: Arc::new(Cell::empty()),
        }
    }

    #[test]
    fn test_subwallet_id_follows_workchain() {
        assert_eq!(signer().subwallet_id(), DEFAULT_SUBWALLET_ID);

        let master = TonAddress::parse(&format!("-1:{}", "22".repeat(32))).unwrap();
        let signer = V4R2Signer::new(SigningKey::from_bytes(&[1u8; 32]), master);
        assert_eq!(signer.subwallet_id(), DEFAULT_SUBWALLET_ID - 1);
    }

    #[test]
    fn test_transfer_body_layout() {
        let body = signer().create_transfer_body(5, 1000, &[message(42)]).unwrap();
        let mut slice = body.parse();
        assert_eq!(slice.load_u32().unwrap(), DEFAULT_SUBWALLET_ID);
        assert_eq!(slice.load_u32().unwrap(), 1000);
        assert_eq!(slice.load_u32().unwrap(), 5);
        assert_eq!(slice.load_u8().unwrap(), 0);
        assert_eq!(slice.load_u8().unwrap(), 1);
        assert_eq!(slice.bits_left(), 0);

        let internal = slice.load_ref().unwrap();
        let mut msg = internal.parse();
        assert!(!msg.load_bit().unwrap());
        assert!(msg.load_bit().unwrap());
        assert!(!msg.load_bit().unwrap());
        assert!(!msg.load_bit().unwrap());
        assert_eq!(msg.load_uint(2).unwrap(), 0);
        assert_eq!(msg.load_uint(2).unwrap(), 0b10);
        msg.load_bit().unwrap();
        assert_eq!(msg.load_u8().unwrap(), 0);
        assert_eq!(msg.load_bytes(32).unwrap(), vec![0x11; 32]);
        assert_eq!(msg.load_coins().unwrap(), 42);
    }

    #[test]
    fn test_signature_verifies() {
        let signer = signer();
        let body = signer.create_transfer_body(1, 1000, &[message(1)]).unwrap();
        let signed = signer.sign(&body).unwrap();

        assert_eq!(signed.bit_len(), 512 + body.bit_len());
        assert_eq!(signed.references().len(), body.references().len());

        let mut slice = signed.parse();
        let sig_bytes: [u8; 64] = slice.load_bytes(64).unwrap().try_into().unwrap();
        let signature = Signature::from_bytes(&sig_bytes);
        let verifying = SigningKey::from_bytes(&[7u8; 32]).verifying_key();
        assert!(verifying.verify(&body.hash(), &signature).is_ok());
    }

    #[test]
    fn test_external_message_header() {
        let signer = signer();
        let ext = signer.build_signed_transfer(1, 1000, &[message(1)], false).unwrap();
        let mut slice = ext.parse();
        assert_eq!(slice.load_uint(2).unwrap(), 0b10);
        assert_eq!(slice.load_uint(2).unwrap(), 0b00);
        assert_eq!(slice.load_uint(2).unwrap(), 0b10);
        slice.load_bit().unwrap();
        slice.load_u8().unwrap();
        assert_eq!(&slice.load_bytes(32).unwrap()[..], signer.address().hash_part());
        assert_eq!(slice.load_coins().unwrap(), 0);
        assert!(!slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap());
        assert_eq!(ext.references().len(), 1);
    }

    #[test]
    fn test_wallet_code_hash() {
        let code = deserialize_boc_base64(WALLET_V4R2_CODE).unwrap();
        assert_eq!(
            hex::encode(code.hash()),
            "feb5ff6820e2ff0d9483e7e0d62c817d846789fb4ae580c878866d959dabd5c0"
        );
    }

    #[test]
    fn test_derived_address_matches_state_init() {
        let key = SigningKey::from_bytes(&[7u8; 32]);
        let address = derive_address(&key.verifying_key().to_bytes(), 0).unwrap();
        assert_eq!(address.workchain(), 0);
        assert_eq!(
            hex::encode(address.hash_part()),
            "2a6ee6b7ff41bfecafe383386325c7a895f4fe4ce346b18eb9c14a0152d6629c"
        );

        let signer = V4R2Signer::from_key(key, 0).unwrap();
        assert_eq!(signer.address(), &address);
        assert_eq!(&signer.state_init().unwrap().hash(), address.hash_part());

        let reparsed = TonAddress::parse(&address.to_user_friendly()).unwrap();
        let signer = V4R2Signer::new(SigningKey::from_bytes(&[7u8; 32]), reparsed);
        assert_eq!(signer.subwallet_id(), DEFAULT_SUBWALLET_ID);
        assert_eq!(&signer.state_init().unwrap().hash(), address.hash_part());
    }

    #[test]
    fn test_deploy_message_carries_state_init() {
        let signer = V4R2Signer::from_key(SigningKey::from_bytes(&[7u8; 32]), 0).unwrap();
        let ext = signer.build_signed_transfer(0, 1000, &[message(1)], true).unwrap();
        let mut slice = ext.parse();
        assert_eq!(slice.load_uint(4).unwrap(), 0b1000);
        assert_eq!(slice.load_uint(3).unwrap(), 0b100);
        slice.load_u8().unwrap();
        slice.load_bytes(32).unwrap();
        assert_eq!(slice.load_coins().unwrap(), 0);
        assert!(slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap());
        assert!(slice.load_bit().unwrap());
        assert_eq!(slice.bits_left(), 0);

        assert_eq!(ext.references().len(), 2);
        assert_eq!(&ext.references()[0].hash(), signer.address().hash_part());
        let state_init = &ext.references()[0];
        let mut data = state_init.references()[1].parse();
        assert_eq!(data.load_u32().unwrap(), 0);
        assert_eq!(data.load_u32().unwrap(), DEFAULT_SUBWALLET_ID);
        assert_eq!(data.load_bytes(32).unwrap(), signer.public_key().to_vec());
    }

    #[test]
    fn test_message_count_is_bounded() {
        let signer = signer();
        assert!(matches!(
            signer.create_transfer_body(0, 0, &[]),
            Err(WalletError::InvalidMessageCount(0))
        ));
        let five: Vec<_> = (0..5).map(message).collect();
        assert!(matches!(
            signer.create_transfer_body(0, 0, &five),
            Err(WalletError::InvalidMessageCount(5))
        ));
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let rendered = format!("{:?}", signer());
        assert!(!rendered.contains(&hex::encode([7u8; 32])));
        assert!(rendered.contains("public_key"));
    }
}
