//! Student and faculty registration with identity NFT mint.

use super::{parse_wallet, require_text, Portal, PortalError, PortalResult};
use crate::domain::{Faculty, LedgerEntry, NewFaculty, NewUser, TxKind, User};

impl Portal {
    /// Insert the user, then mint their identity token.
    ///
    /// The row is written first because the token URI embeds the user id.
    /// A failed mint removes the row again.
    pub async fn register_user(&self, new_user: NewUser) -> PortalResult<User> {
        require_text("roll_number", &new_user.roll_number)?;
        require_text("name", &new_user.name)?;
        require_text("email", &new_user.email)?;
        if let Some(wallet) = new_user.wallet_address.as_deref() {
            parse_wallet(wallet)?;
        }

        if self.store.find_user_by_email(&new_user.email).await?.is_some() {
            return Err(PortalError::Conflict(format!(
                "Email {} is already registered",
                new_user.email
            )));
        }

        let user = self.store.insert_user(&new_user).await?;
        tracing::info!(user_id = user.user_id, email = %user.email, "User registered");

        let Some(ledger) = &self.ledger else {
            return Ok(user);
        };

        let uri = self.identity_uri(user.user_id);
        let receipt = match ledger.mint_identity(&user.email, &uri).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if let Err(cleanup) = self.store.delete_user(user.user_id).await {
                    tracing::error!(
                        user_id = user.user_id,
                        error = %cleanup,
                        "Failed to remove user after identity mint failure"
                    );
                }
                return Err(e.into());
            }
        };

        let entry = LedgerEntry {
            user_id: user.user_id,
            kind: TxKind::IdentityMint,
            amount: None,
            tx_hash: receipt.tx_hash.clone(),
        };
        let user = self
            .store
            .set_user_identity(user.user_id, receipt.token_id.as_deref(), &entry)
            .await
            .map_err(|e| self.diverged("identity_mint", &receipt.tx_hash, e))?;

        tracing::info!(
            user_id = user.user_id,
            token_id = ?user.identity_token_id,
            tx_hash = %receipt.tx_hash,
            "Identity minted"
        );
        Ok(user)
    }

    pub async fn register_faculty(&self, new_faculty: NewFaculty) -> PortalResult<Faculty> {
        require_text("name", &new_faculty.name)?;
        require_text("email", &new_faculty.email)?;
        if let Some(wallet) = new_faculty.wallet_address.as_deref() {
            parse_wallet(wallet)?;
        }

        if self
            .store
            .find_faculty_by_email(&new_faculty.email)
            .await?
            .is_some()
        {
            return Err(PortalError::Conflict(format!(
                "Email {} is already registered",
                new_faculty.email
            )));
        }

        let faculty = self.store.insert_faculty(&new_faculty).await?;
        tracing::info!(faculty_id = faculty.faculty_id, "Faculty registered");

        let Some(ledger) = &self.ledger else {
            return Ok(faculty);
        };

        let uri = self.faculty_uri(faculty.faculty_id);
        let receipt = match ledger.mint_identity(&faculty.email, &uri).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if let Err(cleanup) = self.store.delete_faculty(faculty.faculty_id).await {
                    tracing::error!(
                        faculty_id = faculty.faculty_id,
                        error = %cleanup,
                        "Failed to remove faculty after identity mint failure"
                    );
                }
                return Err(e.into());
            }
        };

        self.store
            .set_faculty_identity(
                faculty.faculty_id,
                receipt.token_id.as_deref(),
                &receipt.tx_hash,
            )
            .await
            .map_err(|e| self.diverged("faculty_identity_mint", &receipt.tx_hash, e))
    }
}
