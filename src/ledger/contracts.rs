//! Contract bindings for the two market-ledger generations and the payment
//! token. Read-only surface plus `claim`, which this service only ever
//! executes as an `eth_call` dry-run.

use alloy::sol;

sol! {
    /// Legacy binary-outcome contract. The only thing the pipeline needs from
    /// it is the native leaderboard getter.
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IMarketV1 {
        function getLeaderboard(uint256 offset, uint256 limit)
            external
            view
            returns (address[] memory wallets, uint256[] memory winnings, uint256[] memory tradeCounts);
    }

    /// Multi-option contract (current generation).
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IMarketV2 {
        function marketCount() external view returns (uint256 count);

        function getMarketStatus(uint256 marketId)
            external
            view
            returns (bool resolved, bool invalidated, uint256 winningOption, uint256 optionCount);

        function getResolution(uint256 marketId)
            external
            view
            returns (bool disputed, uint256 resolvedAt);

        function balanceOf(uint256 marketId, uint256 option, address account)
            external
            view
            returns (uint256 balance);

        /// Reverts when `index` is past the end of the wallet's history.
        function userTradeAt(address account, uint256 index)
            external
            view
            returns (uint256 marketId, uint256 option, uint256 shares);

        /// Returns the zero address past the end of the participants index.
        function participantAt(uint256 index) external view returns (address participant);

        function getPortfolio(address account)
            external
            view
            returns (uint256 totalWinnings, uint256 tradeCount);

        function payoutPerShare() external view returns (uint256 value);

        function claim(uint256 marketId) external;
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IERC20Meta {
        function decimals() external view returns (uint8);
    }
}
