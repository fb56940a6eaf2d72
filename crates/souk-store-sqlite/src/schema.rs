//! SQL schema for the souk SQLite store.
//!
//! Executed once at connection startup. Every writable table records the
//! acting user (`created_by`, `sender`, `submitted_by`, `uploaded_by`,
//! `author`), and the `policy_*` triggers check that user against company
//! ownership and RFQ participation. A refused write aborts with a message
//! starting with `policy:`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS companies (
    company_id TEXT PRIMARY KEY,
    owner      TEXT NOT NULL REFERENCES users(user_id),
    name       TEXT NOT NULL CHECK (length(trim(name)) >= 2),
    -- `name` lower-cased with full Unicode folding, written by the store.
    name_fold  TEXT NOT NULL,
    country    TEXT,
    role       TEXT NOT NULL CHECK (role IN ('importer', 'supplier')),
    score      REAL,
    kyc_level  INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS rfqs (
    rfq_id           TEXT PRIMARY KEY,
    buyer_company_id TEXT NOT NULL REFERENCES companies(company_id),
    title            TEXT NOT NULL CHECK (length(trim(title)) >= 3),
    description      TEXT,
    created_by       TEXT NOT NULL REFERENCES users(user_id),
    created_at       TEXT NOT NULL,
    idempotency_key  TEXT,
    UNIQUE (created_by, idempotency_key)
);

CREATE TABLE IF NOT EXISTS rfq_participants (
    rfq_id     TEXT NOT NULL REFERENCES rfqs(rfq_id),
    user_id    TEXT NOT NULL REFERENCES users(user_id),
    role       TEXT NOT NULL CHECK (role IN ('buyer', 'supplier')),
    created_at TEXT NOT NULL,
    PRIMARY KEY (rfq_id, user_id)
);

CREATE TABLE IF NOT EXISTS quotes (
    quote_id          TEXT PRIMARY KEY,
    rfq_id            TEXT NOT NULL REFERENCES rfqs(rfq_id),
    supplier_id       TEXT NOT NULL REFERENCES companies(company_id),
    price             REAL CHECK (price IS NULL OR price >= 0),
    message           TEXT,
    status            TEXT NOT NULL DEFAULT 'sent'
                      CHECK (status IN ('sent', 'accepted', 'rejected')),
    submitted_by      TEXT NOT NULL REFERENCES users(user_id),
    status_changed_by TEXT REFERENCES users(user_id),
    created_at        TEXT NOT NULL,
    idempotency_key   TEXT,
    UNIQUE (submitted_by, idempotency_key)
);

CREATE TABLE IF NOT EXISTS messages (
    message_id      TEXT PRIMARY KEY,
    rfq_id          TEXT NOT NULL REFERENCES rfqs(rfq_id),
    sender          TEXT NOT NULL REFERENCES users(user_id),
    body            TEXT NOT NULL
                    CHECK (length(trim(body)) > 0 AND length(body) <= 4000),
    created_at      TEXT NOT NULL,
    idempotency_key TEXT,
    UNIQUE (sender, idempotency_key)
);

CREATE TABLE IF NOT EXISTS ratings (
    rating_id         TEXT PRIMARY KEY,
    rater_id          TEXT NOT NULL REFERENCES companies(company_id),
    target_id         TEXT NOT NULL REFERENCES companies(company_id),
    overall           INTEGER NOT NULL CHECK (overall BETWEEN 1 AND 5),
    quality           INTEGER CHECK (quality BETWEEN 1 AND 5),
    timeliness        INTEGER CHECK (timeliness BETWEEN 1 AND 5),
    compliance        INTEGER CHECK (compliance BETWEEN 1 AND 5),
    communication     INTEGER CHECK (communication BETWEEN 1 AND 5),
    importer_disputes TEXT NOT NULL DEFAULT '[]',
    supplier_issues   TEXT NOT NULL DEFAULT '[]',
    evidence_urls     TEXT NOT NULL DEFAULT '[]',
    comment           TEXT NOT NULL,
    rfq_id            TEXT REFERENCES rfqs(rfq_id),
    submitted_by      TEXT NOT NULL REFERENCES users(user_id),
    created_at        TEXT NOT NULL,
    CONSTRAINT rating_not_self CHECK (rater_id != target_id),
    CONSTRAINT rating_comment_length CHECK (length(trim(comment)) >= 140)
);

CREATE TABLE IF NOT EXISTS reviews (
    review_id  TEXT PRIMARY KEY,
    company_id TEXT NOT NULL REFERENCES companies(company_id),
    author     TEXT NOT NULL REFERENCES users(user_id),
    rating     INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    comment    TEXT CHECK (comment IS NULL OR length(comment) <= 2000),
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS kyc_documents (
    doc_id       TEXT PRIMARY KEY,
    company_id   TEXT NOT NULL REFERENCES companies(company_id),
    doc_type     TEXT NOT NULL CHECK (doc_type IN
                 ('passport', 'id_card', 'business_registration', 'tax_certificate', 'other')),
    storage_path TEXT NOT NULL UNIQUE,
    status       TEXT NOT NULL DEFAULT 'pending'
                 CHECK (status IN ('pending', 'approved', 'rejected')),
    uploaded_by  TEXT NOT NULL REFERENCES users(user_id),
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS products (
    product_id  TEXT PRIMARY KEY,
    company_id  TEXT NOT NULL REFERENCES companies(company_id),
    name        TEXT NOT NULL CHECK (length(trim(name)) >= 2),
    category    TEXT,
    description TEXT,
    created_by  TEXT NOT NULL REFERENCES users(user_id),
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS listings (
    listing_id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL REFERENCES products(product_id),
    moq        INTEGER CHECK (moq IS NULL OR moq >= 1),
    price_min  REAL CHECK (price_min IS NULL OR price_min >= 0),
    price_max  REAL CHECK (price_max IS NULL OR price_max >= 0),
    incoterm   TEXT,
    status     TEXT NOT NULL DEFAULT 'draft'
               CHECK (status IN ('draft', 'active', 'archived')),
    created_by TEXT NOT NULL REFERENCES users(user_id),
    created_at TEXT NOT NULL,
    CONSTRAINT listing_price_range
      CHECK (price_min IS NULL OR price_max IS NULL OR price_min <= price_max)
);

CREATE INDEX IF NOT EXISTS companies_owner_idx  ON companies(owner);
CREATE INDEX IF NOT EXISTS rfqs_buyer_idx       ON rfqs(buyer_company_id);
CREATE INDEX IF NOT EXISTS participants_user_idx ON rfq_participants(user_id);
CREATE INDEX IF NOT EXISTS quotes_rfq_idx       ON quotes(rfq_id);
CREATE INDEX IF NOT EXISTS quotes_supplier_idx  ON quotes(supplier_id);
CREATE INDEX IF NOT EXISTS messages_rfq_idx     ON messages(rfq_id, created_at);
CREATE INDEX IF NOT EXISTS ratings_target_idx   ON ratings(target_id);
CREATE INDEX IF NOT EXISTS reviews_company_idx  ON reviews(company_id);
CREATE INDEX IF NOT EXISTS kyc_company_idx      ON kyc_documents(company_id);
CREATE INDEX IF NOT EXISTS products_company_idx ON products(company_id);

CREATE VIEW IF NOT EXISTS company_rating_stats AS
    SELECT target_id AS company_id,
           AVG(overall) AS avg_score,
           COUNT(*)     AS ratings_count
    FROM ratings
    GROUP BY target_id;

-- ── Row-level policies ──────────────────────────────────────────────────────

CREATE TRIGGER IF NOT EXISTS policy_rfq_insert
BEFORE INSERT ON rfqs
WHEN NOT EXISTS (SELECT 1 FROM companies
                 WHERE company_id = NEW.buyer_company_id AND owner = NEW.created_by)
BEGIN
    SELECT RAISE(ABORT, 'policy: rfq buyer company is not owned by its creator');
END;

CREATE TRIGGER IF NOT EXISTS policy_rfq_immutable
BEFORE UPDATE ON rfqs
BEGIN
    SELECT RAISE(ABORT, 'policy: rfqs are immutable');
END;

CREATE TRIGGER IF NOT EXISTS policy_participant_buyer
BEFORE INSERT ON rfq_participants
WHEN NEW.role = 'buyer' AND NOT EXISTS (
    SELECT 1 FROM rfqs r JOIN companies c ON c.company_id = r.buyer_company_id
    WHERE r.rfq_id = NEW.rfq_id AND c.owner = NEW.user_id)
BEGIN
    SELECT RAISE(ABORT, 'policy: buyer participant must own the rfq buyer company');
END;

CREATE TRIGGER IF NOT EXISTS policy_quote_insert
BEFORE INSERT ON quotes
WHEN NOT EXISTS (SELECT 1 FROM companies
                 WHERE company_id = NEW.supplier_id AND owner = NEW.submitted_by)
BEGIN
    SELECT RAISE(ABORT, 'policy: quoting company is not owned by the submitter');
END;

CREATE TRIGGER IF NOT EXISTS policy_quote_fields_immutable
BEFORE UPDATE OF quote_id, rfq_id, supplier_id, price, message, submitted_by, created_at
ON quotes
BEGIN
    SELECT RAISE(ABORT, 'policy: only a quote status may change');
END;

CREATE TRIGGER IF NOT EXISTS policy_quote_status
BEFORE UPDATE OF status ON quotes
WHEN NOT EXISTS (
    SELECT 1 FROM rfqs r JOIN companies c ON c.company_id = r.buyer_company_id
    WHERE r.rfq_id = NEW.rfq_id AND c.owner = NEW.status_changed_by)
BEGIN
    SELECT RAISE(ABORT, 'policy: only the rfq buyer may change a quote status');
END;

CREATE TRIGGER IF NOT EXISTS policy_message_participant
BEFORE INSERT ON messages
WHEN NOT EXISTS (
        SELECT 1 FROM rfqs r JOIN companies c ON c.company_id = r.buyer_company_id
        WHERE r.rfq_id = NEW.rfq_id AND c.owner = NEW.sender)
 AND NOT EXISTS (
        SELECT 1 FROM rfq_participants p
        WHERE p.rfq_id = NEW.rfq_id AND p.user_id = NEW.sender)
 AND NOT EXISTS (
        SELECT 1 FROM quotes q JOIN companies c ON c.company_id = q.supplier_id
        WHERE q.rfq_id = NEW.rfq_id AND c.owner = NEW.sender)
BEGIN
    SELECT RAISE(ABORT, 'policy: sender is not a participant of this rfq');
END;

CREATE TRIGGER IF NOT EXISTS policy_message_immutable
BEFORE UPDATE ON messages
BEGIN
    SELECT RAISE(ABORT, 'policy: messages are immutable');
END;

CREATE TRIGGER IF NOT EXISTS policy_rating_rater_owner
BEFORE INSERT ON ratings
WHEN NOT EXISTS (SELECT 1 FROM companies
                 WHERE company_id = NEW.rater_id AND owner = NEW.submitted_by)
BEGIN
    SELECT RAISE(ABORT, 'policy: rater company is not owned by the submitter');
END;

CREATE TRIGGER IF NOT EXISTS policy_rating_target_not_own
BEFORE INSERT ON ratings
WHEN EXISTS (SELECT 1 FROM companies
             WHERE company_id = NEW.target_id AND owner = NEW.submitted_by)
BEGIN
    SELECT RAISE(ABORT, 'policy: a company owner cannot rate their own company');
END;

CREATE TRIGGER IF NOT EXISTS policy_rating_roles
BEFORE INSERT ON ratings
WHEN (SELECT role FROM companies WHERE company_id = NEW.rater_id) != 'supplier'
  OR (SELECT role FROM companies WHERE company_id = NEW.target_id) != 'importer'
BEGIN
    SELECT RAISE(ABORT, 'policy: only a supplier may rate an importer');
END;

CREATE TRIGGER IF NOT EXISTS rating_updates_score
AFTER INSERT ON ratings
BEGIN
    UPDATE companies
    SET score = (SELECT AVG(overall) FROM ratings WHERE target_id = NEW.target_id)
    WHERE company_id = NEW.target_id;
END;

CREATE TRIGGER IF NOT EXISTS policy_review_not_own
BEFORE INSERT ON reviews
WHEN EXISTS (SELECT 1 FROM companies
             WHERE company_id = NEW.company_id AND owner = NEW.author)
BEGIN
    SELECT RAISE(ABORT, 'policy: a company owner cannot review their own company');
END;

CREATE TRIGGER IF NOT EXISTS policy_kyc_owner
BEFORE INSERT ON kyc_documents
WHEN NOT EXISTS (SELECT 1 FROM companies
                 WHERE company_id = NEW.company_id AND owner = NEW.uploaded_by)
BEGIN
    SELECT RAISE(ABORT, 'policy: kyc documents may only be uploaded by the company owner');
END;

CREATE TRIGGER IF NOT EXISTS policy_product_owner
BEFORE INSERT ON products
WHEN NOT EXISTS (SELECT 1 FROM companies
                 WHERE company_id = NEW.company_id AND owner = NEW.created_by)
BEGIN
    SELECT RAISE(ABORT, 'policy: product company is not owned by its creator');
END;

CREATE TRIGGER IF NOT EXISTS policy_listing_owner
BEFORE INSERT ON listings
WHEN NOT EXISTS (
    SELECT 1 FROM products p JOIN companies c ON c.company_id = p.company_id
    WHERE p.product_id = NEW.product_id AND c.owner = NEW.created_by)
BEGIN
    SELECT RAISE(ABORT, 'policy: listed product is not owned by the listing creator');
END;

PRAGMA user_version = 1;
";
