use alloy::{
    primitives::{Address, Bytes, keccak256},
    signers::{SignerSync, local::PrivateKeySigner},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Key material handed to the dispatcher alongside a transaction. The
/// translator passes it through without inspecting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningMaterial {
    pub sign_key: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_bundle: Option<Bytes>,
}

/// Account identified by its raw public key.
#[derive(Debug, Clone)]
pub struct PublicKeyAccount {
    pub name: String,
    pub signer: PrivateKeySigner,
}

/// Account identified by a member certificate.
#[derive(Debug, Clone)]
pub struct CertificateAccount {
    pub name: String,
    pub signer: PrivateKeySigner,
    pub cert_pem: Bytes,
}

#[derive(Debug, Clone)]
pub enum Account {
    PublicKey(PublicKeyAccount),
    Certificate(CertificateAccount),
}

impl Account {
    pub fn public_key(name: impl Into<String>, signer: PrivateKeySigner) -> Self {
        Account::PublicKey(PublicKeyAccount {
            name: name.into(),
            signer,
        })
    }

    pub fn certificate(
        name: impl Into<String>,
        signer: PrivateKeySigner,
        cert_pem: impl Into<Bytes>,
    ) -> Self {
        Account::Certificate(CertificateAccount {
            name: name.into(),
            signer,
            cert_pem: cert_pem.into(),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Account::PublicKey(account) => &account.name,
            Account::Certificate(account) => &account.name,
        }
    }

    fn signer(&self) -> &PrivateKeySigner {
        match self {
            Account::PublicKey(account) => &account.signer,
            Account::Certificate(account) => &account.signer,
        }
    }

    /// What the ledger records as the transaction sender: the uncompressed
    /// public key without its tag byte, or the certificate.
    pub fn member_info(&self) -> Bytes {
        match self {
            Account::PublicKey(account) => {
                let point = account
                    .signer
                    .credential()
                    .verifying_key()
                    .to_encoded_point(false);
                Bytes::copy_from_slice(&point.as_bytes()[1..])
            }
            Account::Certificate(account) => account.cert_pem.clone(),
        }
    }

    /// EVM-style address derived from the member info.
    pub fn identity(&self) -> Address {
        identity_from_member_info(&self.member_info())
    }

    pub fn sign(&self, message: &[u8]) -> Result<Bytes> {
        let signature = self.signer().sign_message_sync(message)?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    pub fn signing_material(&self) -> SigningMaterial {
        SigningMaterial {
            sign_key: Bytes::copy_from_slice(self.signer().to_bytes().as_slice()),
            cert_bundle: match self {
                Account::PublicKey(_) => None,
                Account::Certificate(account) => Some(account.cert_pem.clone()),
            },
        }
    }
}

/// Last 20 bytes of keccak256 over the sender's member info.
pub fn identity_from_member_info(member_info: &[u8]) -> Address {
    Address::from_slice(&keccak256(member_info)[12..])
}

/// Maps a ledger sender's member info to the identity shown on
/// reconstructed transactions.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, member_info: &[u8]) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeccakIdentityResolver;

impl IdentityResolver for KeccakIdentityResolver {
    fn resolve(&self, member_info: &[u8]) -> Result<String> {
        Ok(identity_from_member_info(member_info).to_checksum(None))
    }
}
