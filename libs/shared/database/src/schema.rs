//! SQLite schema definition.

pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Reference data
-- ============================================================================

CREATE TABLE IF NOT EXISTS blood_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

INSERT OR IGNORE INTO blood_groups (name) VALUES
    ('A+'), ('A-'), ('B+'), ('B-'), ('AB+'), ('AB-'), ('O+'), ('O-');

-- ============================================================================
-- Users (donors, staff, system accounts)
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    user_type TEXT NOT NULL
        CHECK (user_type IN ('donor', 'hospital_staff', 'center_staff', 'customer', 'system')),
    phone TEXT,
    first_name TEXT,
    last_name TEXT,
    date_of_birth TEXT,
    gender TEXT,
    blood_group_id INTEGER REFERENCES blood_groups(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_type ON users(user_type);

-- ============================================================================
-- Institutions (each owns exactly one staff user)
-- ============================================================================

CREATE TABLE IF NOT EXISTS hospitals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
    name TEXT NOT NULL,
    address TEXT,
    phone TEXT,
    email TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS blood_centers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL UNIQUE REFERENCES users(id),
    name TEXT NOT NULL,
    address TEXT,
    phone TEXT,
    email TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS recipients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hospital_id INTEGER NOT NULL REFERENCES hospitals(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    id_number TEXT,
    date_of_birth TEXT,
    gender TEXT,
    blood_group_id INTEGER NOT NULL REFERENCES blood_groups(id),
    medical_notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_recipients_hospital ON recipients(hospital_id);

-- ============================================================================
-- Appointments and donations
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    blood_center_id INTEGER NOT NULL REFERENCES blood_centers(id) ON DELETE CASCADE,
    appointment_date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'scheduled'
        CHECK (status IN ('scheduled', 'confirmed', 'completed', 'cancelled', 'no_show')),
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_appointments_center ON appointments(blood_center_id);
CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status);

-- ============================================================================
-- Blood requests
-- ============================================================================

CREATE TABLE IF NOT EXISTS blood_requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hospital_id INTEGER NOT NULL REFERENCES hospitals(id) ON DELETE CASCADE,
    request_date TEXT NOT NULL,
    notes TEXT,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'partial', 'fulfilled', 'cancelled')),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_blood_requests_hospital ON blood_requests(hospital_id);
CREATE INDEX IF NOT EXISTS idx_blood_requests_status ON blood_requests(status);

CREATE TABLE IF NOT EXISTS blood_request_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    blood_request_id INTEGER NOT NULL REFERENCES blood_requests(id) ON DELETE CASCADE,
    blood_group_id INTEGER NOT NULL REFERENCES blood_groups(id),
    recipient_id INTEGER REFERENCES recipients(id),
    units_requested INTEGER NOT NULL CHECK (units_requested > 0),
    urgency TEXT NOT NULL CHECK (urgency IN ('urgent', 'normal', 'low')),
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'fulfilled', 'cancelled')),
    unique_code TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_request_items_request ON blood_request_items(blood_request_id);

CREATE TABLE IF NOT EXISTS donations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id),
    blood_center_id INTEGER NOT NULL REFERENCES blood_centers(id),
    blood_group_id INTEGER NOT NULL REFERENCES blood_groups(id),
    appointment_id INTEGER REFERENCES appointments(id) ON DELETE SET NULL,
    blood_request_item_id INTEGER REFERENCES blood_request_items(id) ON DELETE SET NULL,
    volume_ml INTEGER NOT NULL CHECK (volume_ml > 0),
    weight REAL,
    donation_date_time TEXT NOT NULL,
    screening_status TEXT NOT NULL DEFAULT 'not_screened'
        CHECK (screening_status IN ('not_screened', 'passed', 'failed')),
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_donations_center ON donations(blood_center_id);
CREATE INDEX IF NOT EXISTS idx_donations_item ON donations(blood_request_item_id);
"#;
