// Master data
pub mod part;
pub mod product;

// Bill of materials
pub mod bom_item;

// Order documents
pub mod purchase_order;
pub mod purchase_order_item;
pub mod sales_order;
pub mod sales_order_item;

// Stock state and the ledger
pub mod inventory_record;
pub mod inventory_transaction;

// Planning output
pub mod mrp_result;
