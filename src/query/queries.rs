//! Read-side SQL. Each projection is a single statement where possible,
//! so one page of results is one storage snapshot.

/// Active auctions, newest first, with per-auction bid count, highest
/// bidder and the page's total row count in one statement.
pub const GET_ACTIVE_AUCTIONS: &str = r#"
    SELECT a.id, a.name, a.description, a.starting_price, a.current_highest_bid,
           a.auction_end_time, a.created_at,
           COALESCE(bc.total, 0) AS total_bids,
           hb.user_id AS highest_bidder_id,
           hb.bidder_name AS highest_bidder_name,
           hb.amount AS highest_bidder_amount,
           COUNT(*) OVER () AS total
    FROM auctions a
    LEFT JOIN LATERAL (
        SELECT COUNT(*) AS total FROM bids b WHERE b.auction_id = a.id
    ) bc ON TRUE
    LEFT JOIN LATERAL (
        SELECT b.user_id, u.first_name || ' ' || u.last_name AS bidder_name, b.amount
        FROM bids b
        JOIN users u ON u.id = b.user_id
        WHERE b.auction_id = a.id
        ORDER BY b.amount DESC, b.created_at ASC
        LIMIT 1
    ) hb ON TRUE
    WHERE a.is_active
    ORDER BY a.created_at DESC
    LIMIT $1 OFFSET $2
"#;

/// Total fallback for pages past the last row, where the windowed count
/// above returns no rows at all.
pub const COUNT_ACTIVE_AUCTIONS: &str = "SELECT COUNT(*) FROM auctions WHERE is_active";

/// Bid history for one auction, bidder-resolved, newest first.
pub const GET_BID_HISTORY: &str = r#"
    SELECT b.id, b.auction_id, b.user_id, b.amount, b.created_at,
           u.first_name || ' ' || u.last_name AS bidder_name
    FROM bids b
    JOIN users u ON u.id = b.user_id
    WHERE b.auction_id = $1
    ORDER BY b.created_at DESC
"#;

/// Completed auctions with their winning bid, most recently ended first.
pub const GET_AUCTION_RESULTS: &str = r#"
    SELECT a.id, a.name, a.description, a.starting_price, a.current_highest_bid,
           a.auction_end_time, a.created_at,
           COALESCE(bc.total, 0) AS total_bids,
           hb.user_id AS winner_id,
           hb.bidder_name AS winner_name,
           hb.amount AS winner_amount
    FROM auctions a
    LEFT JOIN LATERAL (
        SELECT COUNT(*) AS total FROM bids b WHERE b.auction_id = a.id
    ) bc ON TRUE
    LEFT JOIN LATERAL (
        SELECT b.user_id, u.first_name || ' ' || u.last_name AS bidder_name, b.amount
        FROM bids b
        JOIN users u ON u.id = b.user_id
        WHERE b.auction_id = a.id
        ORDER BY b.amount DESC, b.created_at ASC
        LIMIT 1
    ) hb ON TRUE
    WHERE NOT a.is_active
    ORDER BY a.auction_end_time DESC
"#;

/// Aggregate dashboard counters.
pub const GET_DASHBOARD_STATS: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM auctions) AS total_auctions,
        (SELECT COUNT(*) FROM auctions WHERE is_active) AS active_auctions,
        (SELECT COUNT(*) FROM auctions WHERE NOT is_active) AS completed_auctions,
        (SELECT COUNT(*) FROM bids) AS total_bids
"#;

/// Snapshot isolation for the multi-statement detail read.
pub const SET_REPEATABLE_READ: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ";
