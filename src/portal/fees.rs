//! Semester fee payment.

use super::{Portal, PortalError, PortalResult};
use crate::domain::{
    parse_amount, FeePayment, FeePaymentRequest, LedgerEntry, NewFeePayment, Semester, TxKind,
};

impl Portal {
    pub(crate) async fn require_semester(&self, semester_id: i32) -> PortalResult<Semester> {
        self.store
            .find_semester(semester_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("Semester {} not found", semester_id)))
    }

    /// Pay a semester fee: `payFees` carries the amount as value, then
    /// the payment and its audit row are written in one DB transaction.
    pub async fn pay_fees(&self, request: FeePaymentRequest) -> PortalResult<FeePayment> {
        let user = self.require_user(request.user_id).await?;
        let semester = self.require_semester(request.semester_id).await?;

        if self
            .store
            .find_fee_payment(user.user_id, semester.semester_id)
            .await?
            .is_some()
        {
            return Err(PortalError::Conflict(format!(
                "Fees for semester {} are already paid",
                semester.semester_id
            )));
        }

        let amount = request.amount.trim();
        let wei = parse_amount(amount).map_err(PortalError::Invalid)?;
        let fee = parse_amount(&semester.fee_amount).map_err(PortalError::Store)?;
        if wei != fee {
            return Err(PortalError::Invalid(format!(
                "Amount {} ETH does not match the semester fee of {} ETH",
                amount, semester.fee_amount
            )));
        }
        self.require_identity(&user)?;

        let token_uri = self.fee_uri(user.user_id, semester.semester_id);
        let receipt = match &self.ledger {
            Some(ledger) => Some(ledger.pay_fees(&token_uri, wei).await?),
            None => None,
        };

        let payment = NewFeePayment {
            user_id: user.user_id,
            semester_id: semester.semester_id,
            amount: amount.to_string(),
            token_uri,
            tx_hash: receipt.as_ref().map(|r| r.tx_hash.clone()),
        };
        let entry = receipt.as_ref().map(|r| LedgerEntry {
            user_id: user.user_id,
            kind: TxKind::FeePayment,
            amount: Some(amount.to_string()),
            tx_hash: r.tx_hash.clone(),
        });

        let payment = match self.store.insert_fee_payment(&payment, entry.as_ref()).await {
            Ok(payment) => payment,
            Err(e) => {
                return Err(match &entry {
                    Some(entry) => self.diverged("fee_payment", &entry.tx_hash, e),
                    None => e.into(),
                })
            }
        };

        tracing::info!(
            user_id = user.user_id,
            semester_id = semester.semester_id,
            amount = %payment.amount,
            tx_hash = ?payment.tx_hash,
            "Fees paid"
        );
        Ok(payment)
    }
}
