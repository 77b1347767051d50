//! Payment ledger
//!
//! Payments are append-only; only `refunded_amount` and the derived record
//! status change afterwards. Every change to an order's paid amount is
//! mirrored onto its invoice in the same transaction.

use super::Ledger;
use crate::error::{EngineError, EngineResult, Entity};
use crate::money::{self, MONEY_TOLERANCE};
use crate::numbering::{NumberKind, next_number};
use crate::storage::{CommerceStorage, StorageError};
use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::order::{
    NoteType, Order, OrderNote, Payment, PaymentMethod, PaymentRecordStatus, PaymentStatus,
    VerificationStatus,
};
use shared::util::{new_id, now_millis};
use std::collections::BTreeMap;

/// Copy the order's paid amount and payment status onto its invoice
fn mirror_invoice(
    storage: &CommerceStorage,
    txn: &WriteTransaction,
    order: &Order,
    now: i64,
) -> EngineResult<()> {
    let mut invoice = storage
        .get_invoice_for_order_txn(txn, &order.id)?
        .ok_or_else(|| EngineError::not_found(Entity::Invoice, order.id.clone()))?;
    invoice.paid_amount = order.paid_amount;
    invoice.status = order.payment_status;
    invoice.updated_at = now;
    storage.put_invoice(txn, &invoice)?;
    Ok(())
}

fn load_order(storage: &CommerceStorage, txn: &WriteTransaction, order_id: &str) -> EngineResult<Order> {
    storage
        .get_order_txn(txn, order_id)?
        .ok_or_else(|| EngineError::not_found(Entity::Order, order_id))
}

impl Ledger {
    /// Append a payment row for `amount` and settle it against the order
    #[allow(clippy::too_many_arguments)]
    fn settle_payment(
        &self,
        txn: &WriteTransaction,
        order: &mut Order,
        amount: Decimal,
        method: PaymentMethod,
        metadata: BTreeMap<String, String>,
        recorded_by: Option<&str>,
        now: i64,
    ) -> EngineResult<Payment> {
        let payment_number =
            next_number(&self.storage, txn, NumberKind::Payment, self.business_tz, now)?;
        let payment = Payment {
            id: new_id(),
            payment_number,
            order_id: order.id.clone(),
            amount,
            method,
            status: PaymentRecordStatus::Completed,
            refunded_amount: Decimal::ZERO,
            metadata,
            recorded_by: recorded_by.map(str::to_string),
            created_at: now,
            refunded_at: None,
            refund_reason: None,
        };
        self.storage.put_payment(txn, &payment)?;

        order.paid_amount += amount;
        order.payment_status =
            PaymentStatus::derive(order.total, order.paid_amount, order.refunded_amount);
        order.updated_at = now;
        Ok(payment)
    }

    /// Record a settled payment against an order
    ///
    /// Partial payments accumulate. A payment larger than the remaining
    /// amount is rejected.
    pub fn record_payment(
        &self,
        order_id: &str,
        amount: Decimal,
        method: PaymentMethod,
        metadata: BTreeMap<String, String>,
        recorded_by: Option<&str>,
    ) -> EngineResult<Payment> {
        money::validate_amount(amount, "amount")?;

        let txn = self.storage.begin_write()?;
        let mut order = load_order(&self.storage, &txn, order_id)?;
        if order.status.is_terminal() {
            return Err(EngineError::Validation(format!(
                "cannot record payment on {} order {}",
                order.status, order_id
            )));
        }
        let remaining = order.remaining_amount();
        if amount > remaining + MONEY_TOLERANCE {
            return Err(EngineError::PaymentExceedsRemaining { amount, remaining });
        }

        let now = now_millis();
        let payment =
            self.settle_payment(&txn, &mut order, amount, method, metadata, recorded_by, now)?;
        mirror_invoice(&self.storage, &txn, &order, now)?;
        self.storage.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order_id,
            payment_number = %payment.payment_number,
            amount = %amount,
            method = %method,
            paid = %order.paid_amount,
            payment_status = ?order.payment_status,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Customer uploads a bank-transfer receipt reference
    pub fn submit_receipt(
        &self,
        order_id: &str,
        customer_id: &str,
        reference: &str,
    ) -> EngineResult<Order> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(EngineError::Validation("receipt reference is required".into()));
        }

        let txn = self.storage.begin_write()?;
        let mut order = load_order(&self.storage, &txn, order_id)?;
        if order.customer_id != customer_id {
            return Err(EngineError::not_found(Entity::Order, order_id));
        }
        if order.status.is_terminal()
            || order.payment_status == PaymentStatus::Paid
            || order.receipt.status == VerificationStatus::Verified
        {
            return Err(EngineError::VerificationNotAllowed(format!(
                "order {} does not accept receipts ({}, {:?})",
                order_id, order.status, order.payment_status
            )));
        }

        let now = now_millis();
        order.receipt.status = VerificationStatus::Pending;
        order.receipt.reference = Some(reference.to_string());
        order.receipt.uploaded_at = Some(now);
        order.receipt.rejection_reason = None;
        order.updated_at = now;
        self.storage.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(order_id = %order_id, "Payment receipt submitted");
        Ok(order)
    }

    /// Accept or reject a bank-transfer payment
    ///
    /// Only unpaid orders with a positive total and nothing paid yet can be
    /// verified. Acceptance records one payment for the whole total; rejection
    /// keeps the order unpaid and stores the reason on the order and as a
    /// system note.
    pub fn verify_payment(
        &self,
        order_id: &str,
        verified: bool,
        reviewer_id: &str,
        rejection_reason: Option<String>,
    ) -> EngineResult<Order> {
        let txn = self.storage.begin_write()?;
        let mut order = load_order(&self.storage, &txn, order_id)?;
        if order.status.is_terminal()
            || order.payment_status != PaymentStatus::Unpaid
            || order.total <= Decimal::ZERO
            || order.paid_amount != Decimal::ZERO
        {
            return Err(EngineError::VerificationNotAllowed(format!(
                "order {} is {} ({:?}, {} of {} paid)",
                order_id, order.status, order.payment_status, order.paid_amount, order.total
            )));
        }

        let now = now_millis();
        order.receipt.reviewed_by = Some(reviewer_id.to_string());
        order.receipt.reviewed_at = Some(now);

        if verified {
            let mut metadata = BTreeMap::new();
            if let Some(reference) = &order.receipt.reference {
                metadata.insert("receipt_reference".to_string(), reference.clone());
            }
            let total = order.total;
            let method = order.payment_method;
            self.settle_payment(
                &txn,
                &mut order,
                total,
                method,
                metadata,
                Some(reviewer_id),
                now,
            )?;
            order.payment_status = PaymentStatus::Paid;
            order.receipt.status = VerificationStatus::Verified;
            order.receipt.rejection_reason = None;
        } else {
            order.payment_status = PaymentStatus::Unpaid;
            order.receipt.status = VerificationStatus::Rejected;
            order.receipt.rejection_reason = rejection_reason.clone();
            let content = match &rejection_reason {
                Some(reason) => format!("Payment receipt rejected: {}", reason),
                None => "Payment receipt rejected".to_string(),
            };
            self.storage.append_note(
                &txn,
                OrderNote {
                    id: new_id(),
                    order_id: order.id.clone(),
                    sequence: 0,
                    note_type: NoteType::System,
                    content,
                    author: Some(reviewer_id.to_string()),
                    created_at: now,
                },
            )?;
        }
        order.updated_at = now;

        mirror_invoice(&self.storage, &txn, &order, now)?;
        self.storage.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order_id,
            verified = verified,
            reviewer = %reviewer_id,
            "Payment verification reviewed"
        );
        Ok(order)
    }

    /// Refund part or all of a payment
    pub fn refund_payment(
        &self,
        payment_id: &str,
        amount: Decimal,
        reason: Option<String>,
    ) -> EngineResult<Payment> {
        money::validate_amount(amount, "amount")?;

        let txn = self.storage.begin_write()?;
        let mut payment = self
            .storage
            .get_payment_txn(&txn, payment_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Payment, payment_id))?;
        if payment.status == PaymentRecordStatus::Refunded {
            return Err(EngineError::PaymentAlreadyRefunded(payment_id.to_string()));
        }
        let refundable = payment.refundable_amount();
        if amount > refundable {
            return Err(EngineError::RefundExceedsAmount { amount, refundable });
        }

        let now = now_millis();
        payment.refunded_amount += amount;
        payment.status = if payment.refundable_amount() <= Decimal::ZERO {
            PaymentRecordStatus::Refunded
        } else {
            PaymentRecordStatus::PartiallyRefunded
        };
        payment.refunded_at = Some(now);
        payment.refund_reason = reason;

        let mut order = load_order(&self.storage, &txn, &payment.order_id)?;
        order.paid_amount -= amount;
        order.refunded_amount += amount;
        order.payment_status =
            PaymentStatus::derive(order.total, order.paid_amount, order.refunded_amount);
        order.updated_at = now;

        self.storage.put_payment(&txn, &payment)?;
        mirror_invoice(&self.storage, &txn, &order, now)?;
        self.storage.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order.id,
            payment_number = %payment.payment_number,
            amount = %amount,
            paid = %order.paid_amount,
            payment_status = ?order.payment_status,
            "Payment refunded"
        );
        Ok(payment)
    }

    pub fn get_payment(&self, payment_id: &str) -> EngineResult<Payment> {
        self.storage
            .get_payment(payment_id)?
            .ok_or_else(|| EngineError::not_found(Entity::Payment, payment_id))
    }

    /// Payments for an order, oldest first
    pub fn list_payments(&self, order_id: &str) -> EngineResult<Vec<Payment>> {
        if self.storage.get_order(order_id)?.is_none() {
            return Err(EngineError::not_found(Entity::Order, order_id));
        }
        Ok(self.storage.get_payments_for_order(order_id)?)
    }
}
