//! Built-in signature sets for common contract families.

/// A named, built-in set of event signatures.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    /// Lookup key, case-sensitive.
    pub name: &'static str,
    /// One-line description for listings.
    pub description: &'static str,
    /// Event signatures in display order.
    pub signatures: &'static [&'static str],
}

/// All built-in presets, in listing order.
pub const ALL: &[Preset] = &[
    Preset {
        name: "erc20",
        description: "ERC-20 token transfers and approvals",
        signatures: &[
            "Transfer(address,address,uint256)",
            "Approval(address,address,uint256)",
        ],
    },
    Preset {
        name: "erc721",
        description: "ERC-721 NFT transfers and approvals",
        signatures: &[
            "Transfer(address,address,uint256)",
            "Approval(address,address,uint256)",
            "ApprovalForAll(address,address,bool)",
        ],
    },
    Preset {
        name: "erc1155",
        description: "ERC-1155 multi-token transfers",
        signatures: &[
            "TransferSingle(address,address,address,uint256,uint256)",
            "TransferBatch(address,address,address,uint256[],uint256[])",
            "ApprovalForAll(address,address,bool)",
            "URI(string,uint256)",
        ],
    },
    Preset {
        name: "weth",
        description: "Wrapped-ether deposits, withdrawals, and transfers",
        signatures: &[
            "Deposit(address,uint256)",
            "Withdrawal(address,uint256)",
            "Transfer(address,address,uint256)",
            "Approval(address,address,uint256)",
        ],
    },
    Preset {
        name: "uniswap-v2",
        description: "Uniswap V2 pair activity",
        signatures: &[
            "Swap(address,uint256,uint256,uint256,uint256,address)",
            "Mint(address,uint256,uint256)",
            "Burn(address,uint256,uint256,address)",
            "Sync(uint112,uint112)",
            "PairCreated(address,address,address,uint256)",
        ],
    },
    Preset {
        name: "uniswap-v3",
        description: "Uniswap V3 pool activity",
        signatures: &[
            "Swap(address,address,int256,int256,uint160,uint128,int24)",
            "Mint(address,address,int24,int24,uint128,uint256,uint256)",
            "Burn(address,int24,int24,uint128,uint256,uint256)",
            "Collect(address,address,int24,int24,uint128,uint128)",
            "Flash(address,address,uint256,uint256,uint256,uint256)",
            "PoolCreated(address,address,uint24,int24,address)",
        ],
    },
    Preset {
        name: "chainlink",
        description: "Chainlink aggregator round updates",
        signatures: &[
            "AnswerUpdated(int256,uint256,uint256)",
            "NewRound(uint256,address,uint256)",
        ],
    },
];

/// Look up a built-in preset by name.
#[must_use]
pub fn by_name(name: &str) -> Option<&'static Preset> {
    ALL.iter().find(|preset| preset.name == name)
}

/// Names of all built-in presets, in listing order.
#[must_use]
pub fn names() -> Vec<&'static str> {
    ALL.iter().map(|preset| preset.name).collect()
}
